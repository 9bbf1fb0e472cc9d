//! Layout plan command.

use anyhow::{Context, Result};
use sgfx_core::interop::TextureUsage;
use sgfx_shared::{page_size, plan_layout, HostDevice, HostImageProcessing};

use crate::PlanArgs;

/// Plans a shared buffer layout without allocating.
pub fn run(args: PlanArgs, verbose: bool) -> Result<()> {
    let device = HostDevice::new(args.device.limits());
    if verbose {
        println!("device: {:?} {:?}", args.device, device.limits());
    }
    let plan = plan_layout(
        &device,
        &HostImageProcessing,
        args.format,
        args.width,
        args.height,
        TextureUsage::default(),
        page_size(),
    )
    .with_context(|| format!("Cannot plan {}x{} {}", args.width, args.height, args.format))?;

    println!("{plan}");
    Ok(())
}
