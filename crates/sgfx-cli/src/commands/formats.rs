//! Format table command.

use anyhow::Result;
use sgfx_core::{GpuPixelFormat, VideoPixelFormat};

use super::{is_shareable, or_dash};
use crate::FormatsArgs;

/// Prints GPU or video formats with their layout facts.
pub fn run(args: FormatsArgs, verbose: bool) -> Result<()> {
    if args.video {
        print_video();
    } else {
        print_gpu(args.shared, verbose);
    }
    Ok(())
}

fn print_gpu(shared_only: bool, verbose: bool) {
    println!(
        "{:<22} {:>4} {:>4} {:<22} {:<20} {:<6}",
        "format", "Bpp", "bpc", "video", "color space", "shared"
    );
    let mut count = 0;
    for format in GpuPixelFormat::ALL {
        let shareable = is_shareable(format);
        if shared_only && !shareable {
            continue;
        }
        let video = format.compatible_video_format();
        // sRGB formats share memory with their linear variant's video format.
        let video = match (video, format.is_srgb()) {
            (Some(v), true) => Some(format!("{v} (linear)")),
            (v, _) => v.map(|v| v.to_string()),
        };
        println!(
            "{:<22} {:>4} {:>4} {:<22} {:<20} {:<6}",
            format.name(),
            or_dash(format.bytes_per_pixel()),
            or_dash(format.bits_per_component()),
            or_dash(video),
            or_dash(format.default_color_space().map(|c| format!("{c:?}"))),
            if shareable { "yes" } else { "-" },
        );
        if verbose {
            if let Some(info) = format.bitmap_info() {
                println!(
                    "{:<22} alpha {:?}, byte order {:?}, float {}",
                    "", info.alpha, info.byte_order, info.float_components
                );
            }
        }
        count += 1;
    }
    println!("\n{count} formats");
}

fn print_video() {
    println!("{:<30} {:<6} {:>4} {:>6} {:<14}", "format", "fourcc", "Bpp", "planes", "gpu");
    for format in VideoPixelFormat::ALL {
        let code = format.fourcc().to_be_bytes();
        let fourcc: String = code
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!(
            "{:<30} {:<6} {:>4} {:>6} {:<14}",
            format.name(),
            fourcc,
            or_dash(format.bytes_per_pixel()),
            format.plane_count(),
            or_dash(format.to_gpu_format()),
        );
    }
}
