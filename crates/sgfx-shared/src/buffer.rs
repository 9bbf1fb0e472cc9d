//! Unified shared graphics buffer.
//!
//! [`SharedGraphicsBuffer`] makes one page-aligned allocation and wraps it,
//! without copying, as every consumer needs it:
//!
//! ```text
//!                 PageAllocation (owned, freed once on drop)
//!                           |
//!   +-----------+-----------+-------------+--------------+
//!   |           |           |             |              |
//! GpuBuffer  Texture   ImageBuffer   VideoBuffer   DrawingSurface
//! ```
//!
//! All views share one row stride, planned by [`plan_layout`]. A pixel
//! drawn through the drawing surface is visible through the image buffer,
//! the video buffer, the GPU buffer and the texture at the same byte.
//!
//! # Usage
//!
//! ```rust
//! use sgfx_core::prelude::*;
//! use sgfx_shared::{HostContext, HostSharedBuffer, SharedBufferOptions};
//!
//! let context = HostContext::host_default();
//! let mut buffer = HostSharedBuffer::new(&context, 40, 40, GpuPixelFormat::R8Unorm, SharedBufferOptions::default())
//!     .unwrap();
//!
//! buffer.drawing_surface_mut().fill_rect(Rect::new(10, 10, 20, 20), Color::gray(1.0 / 255.0));
//! let sum: usize = buffer.image_buffer().rows().flat_map(|row| row.iter()).map(|&b| b as usize).sum();
//! assert_eq!(sum, 400);
//! ```
//!
//! # Ownership
//!
//! The buffer is the sole owner of the allocation. The GPU buffer is
//! created with no deallocator, and every view is declared before the
//! allocation so views are dropped first.

use std::fmt;

use sgfx_core::interop::{
    GpuDevice, ImageProcessing, PageAllocator, StorageMode, TextureDescriptor, TextureUsage,
    VideoBufferAttributes, VideoBufferFactory,
};
use sgfx_core::{
    ColorSpace, DescriptorProvider, DrawingSurface, Error, GpuPixelFormat, ImageBuffer, RectangularDataDescriptor,
    Result, VideoPixelFormat,
};
use tracing::{debug, warn};

use crate::backend::{HostDevice, HostDeviceLimits, HostImageProcessing, HostVideoFactory};
use crate::layout::{plan_layout, LayoutPlan};
use crate::memory::{format_bytes, PageAllocation, SystemPageAllocator};

// =============================================================================
// Options and context
// =============================================================================

/// Caller choices for a shared buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedBufferOptions {
    /// Texture usage.
    pub usage: TextureUsage,
    /// GPU storage mode; must be able to alias CPU memory.
    pub storage_mode: StorageMode,
    /// Drawing color space; the format's default when `None`.
    pub color_space: Option<ColorSpace>,
}

impl Default for SharedBufferOptions {
    fn default() -> Self {
        Self {
            usage: TextureUsage::default(),
            storage_mode: StorageMode::Shared,
            color_space: None,
        }
    }
}

impl SharedBufferOptions {
    /// Replaces the texture usage.
    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Replaces the storage mode.
    pub fn with_storage_mode(mut self, storage_mode: StorageMode) -> Self {
        self.storage_mode = storage_mode;
        self
    }

    /// Forces a drawing color space.
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = Some(color_space);
        self
    }
}

/// The collaborators a shared buffer is built with.
#[derive(Debug, Clone, Default)]
pub struct SharedContext<D, V, I> {
    /// GPU device.
    pub device: D,
    /// Video buffer factory.
    pub video: V,
    /// Image processing library.
    pub image_processing: I,
}

impl<D, V, I> SharedContext<D, V, I> {
    /// Bundles collaborators.
    pub fn new(device: D, video: V, image_processing: I) -> Self {
        Self {
            device,
            video,
            image_processing,
        }
    }
}

/// Context of host collaborators.
pub type HostContext = SharedContext<HostDevice, HostVideoFactory, HostImageProcessing>;

impl HostContext {
    /// Host collaborators with the given device limits.
    pub fn host(limits: HostDeviceLimits) -> Self {
        Self::new(HostDevice::new(limits), HostVideoFactory, HostImageProcessing)
    }

    /// Host collaborators with unified-memory limits.
    pub fn host_default() -> Self {
        Self::host(HostDeviceLimits::default())
    }
}

// =============================================================================
// Shared buffer
// =============================================================================

/// Shared buffer built from host collaborators.
pub type HostSharedBuffer = SharedGraphicsBuffer<HostDevice, HostVideoFactory>;

/// One allocation, wrapped as a GPU buffer, a texture, an image buffer, a
/// video buffer and a drawing surface.
pub struct SharedGraphicsBuffer<D, V, A = SystemPageAllocator>
where
    D: GpuDevice,
    V: VideoBufferFactory,
    A: PageAllocator,
{
    layout: LayoutPlan,
    video_format: VideoPixelFormat,
    options: SharedBufferOptions,
    // Views alias `allocation` and must drop before it.
    gpu_buffer: D::Buffer,
    texture: D::Texture,
    image_buffer: ImageBuffer,
    video_buffer: V::VideoBuffer,
    drawing_surface: DrawingSurface,
    allocation: PageAllocation<A>,
}

impl<D, V> SharedGraphicsBuffer<D, V, SystemPageAllocator>
where
    D: GpuDevice,
    V: VideoBufferFactory,
{
    /// Allocates from the system and builds every view.
    pub fn new<I: ImageProcessing>(
        context: &SharedContext<D, V, I>,
        width: usize,
        height: usize,
        format: GpuPixelFormat,
        options: SharedBufferOptions,
    ) -> Result<Self> {
        Self::with_allocator(context, SystemPageAllocator, width, height, format, options)
    }
}

impl<D, V, A> SharedGraphicsBuffer<D, V, A>
where
    D: GpuDevice,
    V: VideoBufferFactory,
    A: PageAllocator,
{
    /// Allocates from `allocator` and builds every view.
    ///
    /// On any failure the allocation is released before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedStorageMode`] for storage that cannot alias CPU memory
    /// - [`Error::UnsupportedPixelFormat`] when the format lacks a video or bitmap mapping
    /// - [`Error::InvalidDimensions`] for zero sizes or overflow
    /// - [`Error::AllocationFailed`] when the allocator fails
    /// - The wrap error of whichever collaborator rejects the memory
    pub fn with_allocator<I: ImageProcessing>(
        context: &SharedContext<D, V, I>,
        allocator: A,
        width: usize,
        height: usize,
        format: GpuPixelFormat,
        options: SharedBufferOptions,
    ) -> Result<Self> {
        if !options.storage_mode.can_alias_cpu() {
            return Err(Error::UnsupportedStorageMode {
                mode: options.storage_mode,
            });
        }
        let unsupported = || Error::unsupported_format(format.name());
        let video_format = format.compatible_video_format().ok_or_else(unsupported)?;
        format.bitmap_info().ok_or_else(unsupported)?;
        let color_space = options
            .color_space
            .or(format.default_color_space())
            .ok_or_else(unsupported)?;

        let layout = plan_layout(
            &context.device,
            &context.image_processing,
            format,
            width,
            height,
            options.usage,
            allocator.page_size(),
        )?;
        let bytes_per_row = layout.bytes_per_row;

        // From here on, an early return drops `allocation` and frees it.
        let allocation = PageAllocation::new(allocator, layout.page_aligned_size)?;
        let base = allocation.as_ptr();

        // SAFETY: `allocation` outlives the buffer; both end up in `Self`
        // with the allocation dropped last.
        let gpu_buffer = unsafe {
            context
                .device
                .new_buffer_no_copy(base, allocation.len(), options.storage_mode.resource_options())
        }
        .map_err(|err| {
            warn!(length = allocation.len(), "GPU rejected shared memory: {}", err);
            match err {
                err @ Error::BufferCreationFailed { .. } => err,
                other => Error::buffer_creation_failed(allocation.len(), other.to_string()),
            }
        })?;

        let descriptor = TextureDescriptor::new_2d(format, width, height)
            .with_usage(options.usage)
            .with_storage_mode(options.storage_mode);
        let texture = context
            .device
            .new_texture_from_buffer(&gpu_buffer, &descriptor, 0, bytes_per_row)
            .map_err(|err| {
                warn!(%format, bytes_per_row, "GPU rejected texture over shared memory: {}", err);
                match err {
                    err @ Error::TextureCreationFailed { .. } => err,
                    other => Error::texture_creation_failed(format, bytes_per_row, 0, other.to_string()),
                }
            })?;

        // SAFETY: the planned rows fit inside the allocation.
        let image_buffer = unsafe { ImageBuffer::from_raw_parts(base, height, width, bytes_per_row) };

        // SAFETY: as above.
        let video_buffer = unsafe {
            context.video.create_no_copy(
                width,
                height,
                video_format,
                base,
                bytes_per_row,
                &VideoBufferAttributes::interop(),
            )
        }
        .map_err(|err| {
            warn!(%video_format, bytes_per_row, "video rejected shared memory: {}", err);
            match err {
                err @ Error::VideoBufferCreationFailed { .. } => err,
                other => Error::video_buffer_creation_failed(video_format, bytes_per_row, other.to_string()),
            }
        })?;

        // SAFETY: as above.
        let drawing_surface = unsafe {
            DrawingSurface::from_raw_parts(base, width, height, bytes_per_row, format, Some(color_space))
        }
        .inspect_err(|err| warn!(%format, ?color_space, "drawing surface rejected shared memory: {}", err))?;

        debug!(
            width,
            height,
            %format,
            %video_format,
            bytes_per_row,
            size = %format_bytes(allocation.len()),
            "shared graphics buffer"
        );
        Ok(Self {
            layout,
            video_format,
            options,
            gpu_buffer,
            texture,
            image_buffer,
            video_buffer,
            drawing_surface,
            allocation,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.layout.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.layout.height
    }

    /// Row stride shared by every view.
    #[inline]
    pub fn bytes_per_row(&self) -> usize {
        self.layout.bytes_per_row
    }

    /// Allocated bytes, a whole number of pages.
    #[inline]
    pub fn allocation_size(&self) -> usize {
        self.allocation.len()
    }

    /// GPU pixel format.
    #[inline]
    pub fn pixel_format(&self) -> GpuPixelFormat {
        self.layout.format
    }

    /// Video pixel format of the video buffer.
    #[inline]
    pub fn video_format(&self) -> VideoPixelFormat {
        self.video_format
    }

    /// Drawing color space.
    #[inline]
    pub fn color_space(&self) -> ColorSpace {
        self.drawing_surface.color_space()
    }

    /// Options the buffer was built with.
    #[inline]
    pub fn options(&self) -> &SharedBufferOptions {
        &self.options
    }

    /// Planned layout.
    #[inline]
    pub fn layout(&self) -> &LayoutPlan {
        &self.layout
    }

    /// GPU buffer over the whole allocation.
    #[inline]
    pub fn gpu_buffer(&self) -> &D::Buffer {
        &self.gpu_buffer
    }

    /// Texture over the GPU buffer at offset zero.
    #[inline]
    pub fn texture(&self) -> &D::Texture {
        &self.texture
    }

    /// Image processing view.
    #[inline]
    pub fn image_buffer(&self) -> &ImageBuffer {
        &self.image_buffer
    }

    /// Image processing view, mutably.
    #[inline]
    pub fn image_buffer_mut(&mut self) -> &mut ImageBuffer {
        &mut self.image_buffer
    }

    /// Video buffer view.
    #[inline]
    pub fn video_buffer(&self) -> &V::VideoBuffer {
        &self.video_buffer
    }

    /// Drawing view.
    #[inline]
    pub fn drawing_surface(&self) -> &DrawingSurface {
        &self.drawing_surface
    }

    /// Drawing view, mutably.
    #[inline]
    pub fn drawing_surface_mut(&mut self) -> &mut DrawingSurface {
        &mut self.drawing_surface
    }

    /// Pixel rows, `bytes_per_row * height` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.allocation.as_slice()[..self.layout.data_length()]
    }

    /// Pixel rows, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.layout.data_length();
        &mut self.allocation.as_mut_slice()[..len]
    }
}

impl<D, V, A> DescriptorProvider for SharedGraphicsBuffer<D, V, A>
where
    D: GpuDevice,
    V: VideoBufferFactory,
    A: PageAllocator,
{
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        // SAFETY: the allocation covers the planned rows and lives as long
        // as `self`.
        Ok(unsafe {
            RectangularDataDescriptor::from_raw_parts(
                self.width(),
                self.height(),
                self.allocation.as_ptr(),
                self.bytes_per_row(),
            )
        })
    }
}

impl<D, V, A> fmt::Debug for SharedGraphicsBuffer<D, V, A>
where
    D: GpuDevice,
    V: VideoBufferFactory,
    A: PageAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGraphicsBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.pixel_format())
            .field("video_format", &self.video_format)
            .field("bytes_per_row", &self.bytes_per_row())
            .field("allocation", &self.allocation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgfx_core::interop::GpuBuffer;
    use sgfx_core::{Color, Rect};

    fn build(format: GpuPixelFormat, options: SharedBufferOptions) -> Result<HostSharedBuffer> {
        HostSharedBuffer::new(&HostContext::host_default(), 40, 40, format, options)
    }

    #[test]
    fn test_views_share_geometry() {
        let buffer = build(GpuPixelFormat::Bgra8Unorm, SharedBufferOptions::default()).unwrap();
        assert_eq!(buffer.bytes_per_row(), 160);
        assert_eq!(buffer.video_format(), VideoPixelFormat::Bgra32);
        assert_eq!(buffer.color_space(), ColorSpace::Srgb);
        assert_eq!(buffer.image_buffer().row_bytes(), 160);
        assert_eq!(buffer.video_buffer().bytes_per_row(), 160);
        assert_eq!(buffer.texture().bytes_per_row(), Some(160));
        assert_eq!(buffer.gpu_buffer().length(), buffer.allocation_size());
        assert_eq!(buffer.drawing_surface().bytes_per_row(), 160);
    }

    #[test]
    fn test_srgb_uses_linear_video_format() {
        let buffer = build(GpuPixelFormat::Rgba8UnormSrgb, SharedBufferOptions::default()).unwrap();
        assert_eq!(buffer.video_format(), VideoPixelFormat::Rgba32);
        assert_eq!(buffer.pixel_format(), GpuPixelFormat::Rgba8UnormSrgb);
    }

    #[test]
    fn test_write_through_bytes() {
        let mut buffer = build(GpuPixelFormat::R8Unorm, SharedBufferOptions::default()).unwrap();
        buffer.as_bytes_mut()[48 * 3 + 5] = 9;
        assert_eq!(buffer.image_buffer().row(3).unwrap()[5], 9);
        assert_eq!(buffer.texture().texel(5, 3), Some(&[9u8][..]));

        buffer.drawing_surface_mut().fill_rect(Rect::new(0, 0, 1, 1), Color::WHITE);
        assert_eq!(buffer.as_bytes()[0], 255);
    }

    #[test]
    fn test_unsupported_inputs() {
        let private = SharedBufferOptions::default().with_storage_mode(StorageMode::Memoryless);
        assert!(matches!(
            build(GpuPixelFormat::R8Unorm, private),
            Err(Error::UnsupportedStorageMode {
                mode: StorageMode::Memoryless
            })
        ));
        assert!(matches!(
            build(GpuPixelFormat::Rg8Unorm, SharedBufferOptions::default()),
            Err(Error::UnsupportedPixelFormat { .. })
        ));
        assert!(matches!(
            build(GpuPixelFormat::Depth32Float, SharedBufferOptions::default()),
            Err(Error::UnsupportedPixelFormat { .. })
        ));
    }
}
