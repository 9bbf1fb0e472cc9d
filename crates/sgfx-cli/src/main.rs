//! sgfx - Zero-copy shared graphics memory CLI
//!
//! Inspects the pixel format table and shared buffer layouts, and builds a
//! shared buffer on the host backend to show every view aliasing one
//! allocation.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sgfx_core::GpuPixelFormat;
use sgfx_shared::HostDeviceLimits;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sgfx")]
#[command(author, version, about = "Zero-copy shared graphics memory tool")]
#[command(long_about = "
Plans and builds page-aligned buffers shared by a GPU texture, a video
buffer, an image-processing buffer and a drawing surface.

Examples:
  sgfx formats                          # Pixel format compatibility table
  sgfx formats --video                  # Video formats and FourCC codes
  sgfx plan -W 1920 -H 1080 -f bgra8Unorm
  sgfx plan -W 40 -H 40 -f r8Unorm --device discrete
  sgfx demo                             # 40x40 r8Unorm fill, level sum 400
  sgfx demo -W 256 -H 128 -f rgba16Float
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pixel format compatibility table
    #[command(visible_alias = "f")]
    Formats(FormatsArgs),

    /// Print the layout plan of a shared buffer
    #[command(visible_alias = "p")]
    Plan(PlanArgs),

    /// Build a shared buffer, draw into it and read it back
    Demo(DemoArgs),
}

/// Device presets.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum DeviceArg {
    /// Integrated GPU sharing system memory
    #[default]
    Unified,
    /// Discrete GPU with stricter alignment
    Discrete,
}

impl DeviceArg {
    fn limits(self) -> HostDeviceLimits {
        match self {
            Self::Unified => HostDeviceLimits::unified_memory(),
            Self::Discrete => HostDeviceLimits::discrete(),
        }
    }
}

#[derive(Args)]
struct FormatsArgs {
    /// List video formats instead of GPU formats
    #[arg(long)]
    video: bool,

    /// Only formats a shared buffer can be built from
    #[arg(short, long)]
    shared: bool,
}

#[derive(Args)]
struct PlanArgs {
    /// Width in pixels
    #[arg(short = 'W', long)]
    width: usize,

    /// Height in pixels
    #[arg(short = 'H', long)]
    height: usize,

    /// GPU pixel format (e.g. r8Unorm, bgra8Unorm, rgba16Float)
    #[arg(short, long, value_parser = parse_format)]
    format: GpuPixelFormat,

    /// Device preset
    #[arg(short, long, value_enum, default_value_t)]
    device: DeviceArg,
}

#[derive(Args)]
struct DemoArgs {
    /// Width in pixels
    #[arg(short = 'W', long, default_value = "40")]
    width: usize,

    /// Height in pixels
    #[arg(short = 'H', long, default_value = "40")]
    height: usize,

    /// GPU pixel format
    #[arg(short, long, default_value = "r8Unorm", value_parser = parse_format)]
    format: GpuPixelFormat,

    /// Device preset
    #[arg(short, long, value_enum, default_value_t)]
    device: DeviceArg,
}

fn parse_format(s: &str) -> std::result::Result<GpuPixelFormat, String> {
    s.parse().map_err(|e: sgfx_core::Error| e.to_string())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Formats(args) => commands::formats::run(args, cli.verbose),
        Commands::Plan(args) => commands::plan::run(args, cli.verbose),
        Commands::Demo(args) => commands::demo::run(args, cli.verbose),
    }
}
