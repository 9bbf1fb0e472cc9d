//! Shared allocation layout planning.
//!
//! Every view over a shared allocation has its own stride and size rules:
//! the GPU wants rows aligned for linear textures over buffers, the image
//! processing library wants its own row alignment, and a heap-placed
//! texture may need more bytes than `rows * stride`. [`plan_layout`]
//! reconciles them into one [`LayoutPlan`] without allocating anything.
//!
//! # Algorithm
//!
//! ```text
//! texture_alignment  = max(min_texture_buffer_alignment, min_linear_texture_alignment)
//! row_alignment      = max(texture_alignment, image_processing_alignment)
//! bytes_per_row      = round_up(bytes_per_pixel * width, row_alignment)
//! allocation_size    = max(bytes_per_row * height, heap_texture_size)
//! page_aligned_size  = round_up(allocation_size, page_size)
//! ```

use std::fmt;

use sgfx_core::interop::{GpuDevice, ImageProcessing, TextureDescriptor, TextureUsage};
use sgfx_core::{checked_align_up, Error, GpuPixelFormat, Result};
use tracing::debug;

use crate::memory::format_bytes;

/// Byte layout every view of a shared allocation agrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Pixel format.
    pub format: GpuPixelFormat,
    /// Bytes per pixel.
    pub bytes_per_pixel: usize,
    /// Bits per component, as passed to the image processing library.
    pub bits_per_component: usize,
    /// Row alignment the GPU needs.
    pub texture_alignment: usize,
    /// Row alignment the image processing library needs.
    pub image_processing_alignment: usize,
    /// Row alignment satisfying both.
    pub row_alignment: usize,
    /// Row stride shared by every view.
    pub bytes_per_row: usize,
    /// Bytes a heap-placed texture of this shape needs.
    pub heap_size: usize,
    /// Bytes needed before page rounding.
    pub allocation_size: usize,
    /// Page size the plan was rounded to.
    pub page_size: usize,
    /// Bytes actually allocated.
    pub page_aligned_size: usize,
}

impl LayoutPlan {
    /// Bytes of the pixel rows, `bytes_per_row * height`.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.bytes_per_row * self.height
    }

    /// Bytes of padding at the end of each row.
    #[inline]
    pub fn row_padding(&self) -> usize {
        self.bytes_per_row - self.bytes_per_pixel * self.width
    }
}

impl fmt::Display for LayoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "format:                     {}", self.format)?;
        writeln!(f, "size:                       {}x{}", self.width, self.height)?;
        writeln!(f, "bytes per pixel:            {}", self.bytes_per_pixel)?;
        writeln!(f, "bits per component:         {}", self.bits_per_component)?;
        writeln!(f, "texture alignment:          {}", self.texture_alignment)?;
        writeln!(f, "image processing alignment: {}", self.image_processing_alignment)?;
        writeln!(f, "row alignment:              {}", self.row_alignment)?;
        writeln!(f, "bytes per row:              {} (+{} padding)", self.bytes_per_row, self.row_padding())?;
        writeln!(f, "heap texture size:          {}", self.heap_size)?;
        writeln!(f, "allocation size:            {}", self.allocation_size)?;
        write!(
            f,
            "page aligned size:          {} ({}, page {})",
            self.page_aligned_size,
            format_bytes(self.page_aligned_size),
            self.page_size
        )
    }
}

/// Plans the layout of a `width` x `height` allocation of `format`.
///
/// Pure: queries the collaborators, allocates nothing.
///
/// # Errors
///
/// - [`Error::InvalidDimensions`] for zero sizes or arithmetic overflow
/// - [`Error::UnsupportedPixelFormat`] when the format has no per-pixel size
/// - Whatever the image processing collaborator reports
pub fn plan_layout<D, I>(
    device: &D,
    image_processing: &I,
    format: GpuPixelFormat,
    width: usize,
    height: usize,
    usage: TextureUsage,
    page_size: usize,
) -> Result<LayoutPlan>
where
    D: GpuDevice + ?Sized,
    I: ImageProcessing + ?Sized,
{
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height, "empty image"));
    }
    let unsupported = || Error::unsupported_format(format.name());
    let bytes_per_pixel = format.bytes_per_pixel().ok_or_else(unsupported)?;
    let bits_per_component = format.bits_per_component().ok_or_else(unsupported)?;

    let texture_alignment = device
        .minimum_texture_buffer_alignment(format)
        .max(device.minimum_linear_texture_alignment(format));
    let image_processing_alignment = image_processing.required_alignment(height, width, bits_per_component)?;
    let row_alignment = texture_alignment.max(image_processing_alignment);

    let overflow = |what: &str| Error::invalid_dimensions(width, height, format!("{what} overflows"));
    let bytes_per_row = bytes_per_pixel
        .checked_mul(width)
        .and_then(|row| checked_align_up(row, row_alignment))
        .ok_or_else(|| overflow("row stride"))?;
    let rows_size = bytes_per_row.checked_mul(height).ok_or_else(|| overflow("image size"))?;

    let descriptor = TextureDescriptor::new_2d(format, width, height).with_usage(usage);
    let heap_size = device.heap_texture_size_and_align(&descriptor).size;
    let allocation_size = rows_size.max(heap_size);
    let page_aligned_size =
        checked_align_up(allocation_size, page_size).ok_or_else(|| overflow("page aligned size"))?;

    let plan = LayoutPlan {
        width,
        height,
        format,
        bytes_per_pixel,
        bits_per_component,
        texture_alignment,
        image_processing_alignment,
        row_alignment,
        bytes_per_row,
        heap_size,
        allocation_size,
        page_size,
        page_aligned_size,
    };
    debug!(
        width,
        height,
        %format,
        bytes_per_row,
        row_alignment,
        allocation_size,
        page_aligned_size,
        "layout plan"
    );
    Ok(plan)
}
