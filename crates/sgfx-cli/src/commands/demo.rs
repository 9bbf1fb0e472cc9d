//! Shared buffer demo command.
//!
//! Draws a centred rectangle through the drawing surface and reads the
//! bytes back through the image-processing view of the same memory.

use anyhow::{Context, Result};
use half::f16;
use sgfx_core::interop::GpuBuffer;
use sgfx_core::{BitmapInfo, ByteOrder, Color, DescriptorProvider, Rect};
use sgfx_shared::{format_bytes, HostContext, HostSharedBuffer, SharedBufferOptions};
use tracing::info;

use crate::DemoArgs;

/// Builds a shared buffer and reports what every view sees.
pub fn run(args: DemoArgs, verbose: bool) -> Result<()> {
    let context = HostContext::host(args.device.limits());
    let mut buffer = HostSharedBuffer::new(
        &context,
        args.width,
        args.height,
        args.format,
        SharedBufferOptions::default(),
    )
    .with_context(|| format!("Cannot build {}x{} {} buffer", args.width, args.height, args.format))?;

    info!(
        width = buffer.width(),
        height = buffer.height(),
        format = %buffer.pixel_format(),
        video = %buffer.video_format(),
        size = %format_bytes(buffer.allocation_size()),
        "shared buffer ready"
    );
    if verbose {
        println!("{}\n", buffer.layout());
    }

    let rect = centred_rect(args.width, args.height);
    let sum = fill_and_sum(&mut buffer, rect);

    let base = buffer.descriptor()?.base_address();
    let views = [
        ("gpu buffer", buffer.gpu_buffer().contents()),
        ("image buffer", buffer.image_buffer().data()),
        ("drawing surface", buffer.drawing_surface().descriptor()?.base_address()),
        ("video buffer", buffer.video_buffer().descriptor()?.base_address()),
    ];

    println!("rect:       {}x{} at ({}, {})", rect.width, rect.height, rect.x, rect.y);
    println!("level sum:  {sum:.1} (color components, 8-bit levels)");
    println!("allocation: {} ({} per row)", format_bytes(buffer.allocation_size()), buffer.bytes_per_row());
    for (name, address) in views {
        println!("{name:<16} {:p} {}", address.as_ptr(), if address == base { "shared" } else { "COPY" });
    }
    if let Some(texel) = buffer.texture().texel(rect.x, rect.y) {
        println!("texture texel at ({}, {}): {texel:?}", rect.x, rect.y);
    }
    Ok(())
}

/// Half-size rectangle centred in the image.
fn centred_rect(width: usize, height: usize) -> Rect {
    Rect::new(width / 4, height / 4, width / 2, height / 2)
}

/// Fills `rect` with gray level 1 through the drawing surface and sums the
/// color components seen by the image-processing view, in 8-bit levels.
///
/// Components are decoded per the buffer format; alpha and row padding are
/// skipped.
fn fill_and_sum(buffer: &mut HostSharedBuffer, rect: Rect) -> f64 {
    buffer.drawing_surface_mut().fill_rect(rect, Color::gray(1.0 / 255.0));

    let format = buffer.pixel_format();
    let (Some(info), Some(components), Some(bits)) =
        (format.bitmap_info(), format.component_count(), format.bits_per_component())
    else {
        return 0.0;
    };
    let alpha = alpha_slot(info, components, bits);
    let pixel_bytes = buffer.layout().bytes_per_pixel;
    let row_bytes = buffer.width() * pixel_bytes;
    let component_bytes = bits / 8;

    buffer
        .image_buffer()
        .rows()
        .flat_map(|row| row[..row_bytes].chunks_exact(pixel_bytes))
        .flat_map(|pixel| pixel.chunks_exact(component_bytes).enumerate())
        .filter(|&(slot, _)| Some(slot) != alpha)
        .map(|(_, bytes)| component_levels(bytes, info.float_components))
        .sum()
}

/// Memory slot of the alpha component, if any.
///
/// 32-bit little-endian words reverse 8-bit components, moving alpha to the
/// other end.
fn alpha_slot(info: BitmapInfo, components: usize, bits: usize) -> Option<usize> {
    if !info.alpha.has_alpha() {
        return None;
    }
    let reversed = info.byte_order == ByteOrder::Little32 && bits == 8;
    Some(if info.alpha.is_first() != reversed { 0 } else { components - 1 })
}

/// One component in 8-bit levels (1.0 is 255).
fn component_levels(bytes: &[u8], float: bool) -> f64 {
    match (float, bytes) {
        (true, &[a, b]) => f64::from(f16::from_le_bytes([a, b]).to_f32()) * 255.0,
        (true, &[a, b, c, d]) => f64::from(f32::from_le_bytes([a, b, c, d])) * 255.0,
        (false, &[a, b]) => f64::from(u16::from_le_bytes([a, b])) * 255.0 / 65535.0,
        (_, &[a, ..]) => f64::from(a),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sgfx_core::GpuPixelFormat;

    fn make_buffer(width: usize, height: usize, format: GpuPixelFormat) -> HostSharedBuffer {
        HostSharedBuffer::new(&HostContext::host_default(), width, height, format, SharedBufferOptions::default())
            .unwrap()
    }

    #[test]
    fn test_centred_rect() {
        let rect = centred_rect(40, 40);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (10, 10, 20, 20));
        // Odd sizes round down
        let rect = centred_rect(7, 5);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (1, 1, 3, 2));
    }

    #[test]
    fn test_fill_and_sum_r8() {
        let mut buffer = make_buffer(40, 40, GpuPixelFormat::R8Unorm);
        assert_eq!(fill_and_sum(&mut buffer, centred_rect(40, 40)), 400.0);
    }

    #[test]
    fn test_fill_and_sum_ignores_padding() {
        // 40 px of one byte pad to a 48 byte stride
        let mut buffer = make_buffer(40, 8, GpuPixelFormat::R8Unorm);
        assert!(buffer.bytes_per_row() > 40);
        buffer.as_bytes_mut().fill(0);
        assert_eq!(fill_and_sum(&mut buffer, Rect::new(0, 0, 40, 8)), 320.0);
    }

    #[test]
    fn test_fill_and_sum_skips_alpha() {
        // Three color components per pixel, opaque alpha not counted
        let mut buffer = make_buffer(40, 40, GpuPixelFormat::Bgra8Unorm);
        assert_eq!(fill_and_sum(&mut buffer, centred_rect(40, 40)), 1200.0);
    }

    #[test]
    fn test_fill_and_sum_half_float() {
        let mut buffer = make_buffer(40, 40, GpuPixelFormat::Rgba16Float);
        let sum = fill_and_sum(&mut buffer, centred_rect(40, 40));
        // f16 rounding of 1/255 stays well under one level in total
        assert_relative_eq!(sum, 1200.0, epsilon = 1.0);
    }

    #[test]
    fn test_alpha_slot() {
        let bgra = GpuPixelFormat::Bgra8Unorm.bitmap_info().unwrap();
        assert_eq!(alpha_slot(bgra, 4, 8), Some(3));
        let rgba = GpuPixelFormat::Rgba16Float.bitmap_info().unwrap();
        assert_eq!(alpha_slot(rgba, 4, 16), Some(3));
        let gray = GpuPixelFormat::R8Unorm.bitmap_info().unwrap();
        assert_eq!(alpha_slot(gray, 1, 8), None);
    }

    #[test]
    fn test_component_levels() {
        assert_eq!(component_levels(&[7], false), 7.0);
        assert_eq!(component_levels(&[0xff, 0xff], false), 255.0);
        assert_eq!(component_levels(&f16::ONE.to_le_bytes(), true), 255.0);
        assert_eq!(component_levels(&0.5f32.to_le_bytes(), true), 127.5);
    }
}
