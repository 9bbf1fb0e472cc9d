//! Host GPU device.
//!
//! A [`GpuDevice`] whose "GPU memory" is plain host memory. It applies the
//! same validation a unified-memory driver applies to no-copy buffers and
//! linear textures, so layouts that pass here are layouts a real device
//! accepts.

use std::fmt;
use std::ptr::NonNull;

use sgfx_core::interop::{
    GpuBuffer, GpuDevice, ResourceOptions, SizeAndAlign, StorageMode, TextureDescriptor, TextureUsage,
};
use sgfx_core::{
    checked_align_up, DescriptorProvider, Error, GpuPixelFormat, RectangularDataDescriptor, Result,
    NO_COPY_BUFFER_GRANULARITY,
};
use tracing::trace;

// =============================================================================
// Limits
// =============================================================================

/// Alignment and size limits of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostDeviceLimits {
    /// Row alignment of linear textures.
    pub linear_texture_alignment: usize,
    /// Minimum row alignment of textures over buffers; raised to the pixel size.
    pub texture_buffer_alignment: usize,
    /// Size granularity and alignment of heap-placed textures.
    pub heap_alignment: usize,
    /// Largest texture edge in pixels.
    pub max_texture_dimension: usize,
}

impl HostDeviceLimits {
    /// Integrated GPU sharing system memory.
    pub const fn unified_memory() -> Self {
        Self {
            linear_texture_alignment: 16,
            texture_buffer_alignment: 16,
            heap_alignment: 16384,
            max_texture_dimension: 16384,
        }
    }

    /// Discrete GPU with stricter row alignment.
    pub const fn discrete() -> Self {
        Self {
            linear_texture_alignment: 256,
            texture_buffer_alignment: 256,
            heap_alignment: 65536,
            max_texture_dimension: 16384,
        }
    }
}

impl Default for HostDeviceLimits {
    fn default() -> Self {
        Self::unified_memory()
    }
}

// =============================================================================
// Buffer
// =============================================================================

/// A no-copy buffer over host memory. Never frees its memory.
pub struct HostBuffer {
    ptr: NonNull<u8>,
    length: usize,
    options: ResourceOptions,
}

// Address plus length; the memory's owner guarantees it outlives the buffer.
unsafe impl Send for HostBuffer {}
unsafe impl Sync for HostBuffer {}

impl HostBuffer {
    /// Options the buffer was created with.
    #[inline]
    pub fn options(&self) -> ResourceOptions {
        self.options
    }

    /// Storage mode the buffer was created with.
    #[inline]
    pub fn storage_mode(&self) -> StorageMode {
        self.options.storage_mode()
    }

    /// Buffer contents as the GPU sees them.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `new_buffer_no_copy` callers guarantee validity.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.length) }
    }
}

impl GpuBuffer for HostBuffer {
    #[inline]
    fn contents(&self) -> NonNull<u8> {
        self.ptr
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuffer")
            .field("ptr", &self.ptr)
            .field("length", &self.length)
            .field("options", &self.options)
            .finish()
    }
}

// =============================================================================
// Texture
// =============================================================================

#[derive(Clone, Copy)]
struct TextureBacking {
    base: NonNull<u8>,
    bytes_per_row: usize,
    offset: usize,
}

/// A 2D texture, either linear over a buffer or device resident.
pub struct HostTexture {
    descriptor: TextureDescriptor,
    backing: Option<TextureBacking>,
}

// Same contract as `HostBuffer`.
unsafe impl Send for HostTexture {}
unsafe impl Sync for HostTexture {}

impl HostTexture {
    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.descriptor.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.descriptor.height
    }

    /// Pixel format.
    #[inline]
    pub fn format(&self) -> GpuPixelFormat {
        self.descriptor.format
    }

    /// Usage flags.
    #[inline]
    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Storage mode.
    #[inline]
    pub fn storage_mode(&self) -> StorageMode {
        self.descriptor.storage_mode
    }

    /// Row stride of the backing buffer, if any.
    #[inline]
    pub fn bytes_per_row(&self) -> Option<usize> {
        self.backing.map(|b| b.bytes_per_row)
    }

    /// Offset into the backing buffer, if any.
    #[inline]
    pub fn buffer_offset(&self) -> Option<usize> {
        self.backing.map(|b| b.offset)
    }

    /// Whether the texture aliases a buffer the CPU can address.
    #[inline]
    pub fn has_backing_buffer(&self) -> bool {
        self.backing.is_some()
    }

    /// Bytes of the texel at `(x, y)`, for linear textures.
    pub fn texel(&self, x: usize, y: usize) -> Option<&[u8]> {
        let backing = self.backing?;
        let bpp = self.descriptor.format.bytes_per_pixel()?;
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let start = y * backing.bytes_per_row + x * bpp;
        // SAFETY: `new_texture_from_buffer` checked every texel lies inside
        // the buffer.
        Some(unsafe { std::slice::from_raw_parts(backing.base.as_ptr().add(start), bpp) })
    }
}

impl fmt::Debug for HostTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTexture")
            .field("format", &self.descriptor.format)
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("storage_mode", &self.descriptor.storage_mode)
            .field("bytes_per_row", &self.bytes_per_row())
            .finish()
    }
}

impl DescriptorProvider for HostTexture {
    /// Device-resident textures have no CPU address and report
    /// [`Error::MissingData`].
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        let backing = self.backing.ok_or(Error::MissingData)?;
        // SAFETY: the buffer range was validated at creation and the memory
        // outlives the texture.
        Ok(unsafe {
            RectangularDataDescriptor::from_raw_parts(
                self.width(),
                self.height(),
                backing.base,
                backing.bytes_per_row,
            )
        })
    }
}

// =============================================================================
// Device
// =============================================================================

/// Host implementation of [`GpuDevice`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDevice {
    limits: HostDeviceLimits,
}

impl HostDevice {
    /// Creates a device with the given limits.
    pub const fn new(limits: HostDeviceLimits) -> Self {
        Self { limits }
    }

    /// Device limits.
    #[inline]
    pub fn limits(&self) -> &HostDeviceLimits {
        &self.limits
    }

    /// Creates a device-resident texture the CPU cannot address.
    pub fn new_texture(&self, descriptor: &TextureDescriptor) -> Result<HostTexture> {
        self.check_extent(descriptor, 0, 0)?;
        trace!(format = %descriptor.format, width = descriptor.width, height = descriptor.height, "device texture");
        Ok(HostTexture {
            descriptor: *descriptor,
            backing: None,
        })
    }

    fn check_extent(&self, descriptor: &TextureDescriptor, bytes_per_row: usize, offset: usize) -> Result<()> {
        let fail = |reason: String| Error::texture_creation_failed(descriptor.format, bytes_per_row, offset, reason);
        let max = self.limits.max_texture_dimension;
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(fail("empty texture".into()));
        }
        if descriptor.width > max || descriptor.height > max {
            return Err(fail(format!(
                "{}x{} exceeds the {max} pixel limit",
                descriptor.width, descriptor.height
            )));
        }
        Ok(())
    }
}

impl GpuDevice for HostDevice {
    type Buffer = HostBuffer;
    type Texture = HostTexture;

    unsafe fn new_buffer_no_copy(
        &self,
        ptr: NonNull<u8>,
        length: usize,
        options: ResourceOptions,
    ) -> Result<HostBuffer> {
        let fail = |reason: &str| Error::buffer_creation_failed(length, reason);
        if length == 0 {
            return Err(fail("empty buffer"));
        }
        if ptr.as_ptr() as usize % NO_COPY_BUFFER_GRANULARITY != 0 {
            return Err(fail("base address is not page aligned"));
        }
        if length % NO_COPY_BUFFER_GRANULARITY != 0 {
            return Err(fail("length is not a whole number of pages"));
        }
        if !options.storage_mode().can_alias_cpu() {
            return Err(fail("storage mode cannot alias CPU memory"));
        }
        trace!(length, ptr = ?ptr, "no-copy buffer");
        Ok(HostBuffer { ptr, length, options })
    }

    fn new_texture_from_buffer(
        &self,
        buffer: &HostBuffer,
        descriptor: &TextureDescriptor,
        offset: usize,
        bytes_per_row: usize,
    ) -> Result<HostTexture> {
        let format = descriptor.format;
        let fail = |reason: String| Error::texture_creation_failed(format, bytes_per_row, offset, reason);

        if format.is_depth_or_stencil() || format.is_compressed() {
            return Err(fail("format cannot back a linear texture".into()));
        }
        let bpp = format
            .bytes_per_pixel()
            .ok_or_else(|| fail("format has no per-pixel size".into()))?;
        if descriptor.storage_mode != buffer.storage_mode() {
            return Err(fail(format!(
                "storage mode {:?} differs from buffer's {:?}",
                descriptor.storage_mode,
                buffer.storage_mode()
            )));
        }
        self.check_extent(descriptor, bytes_per_row, offset)?;

        let alignment = self.minimum_texture_buffer_alignment(format);
        let row = bpp * descriptor.width;
        if bytes_per_row < row {
            return Err(fail(format!("row stride below {row} bytes")));
        }
        if bytes_per_row % alignment != 0 {
            return Err(fail(format!("row stride is not a multiple of {alignment}")));
        }
        if offset % alignment != 0 {
            return Err(fail(format!("offset is not a multiple of {alignment}")));
        }
        let end = bytes_per_row
            .checked_mul(descriptor.height - 1)
            .and_then(|rows| rows.checked_add(row))
            .and_then(|size| size.checked_add(offset));
        match end {
            Some(end) if end <= buffer.length => {}
            _ => return Err(fail(format!("texture exceeds the {} byte buffer", buffer.length))),
        }

        // SAFETY: `offset` is inside the buffer, checked above.
        let base = unsafe { NonNull::new_unchecked(buffer.ptr.as_ptr().add(offset)) };
        trace!(%format, width = descriptor.width, height = descriptor.height, bytes_per_row, offset, "linear texture");
        Ok(HostTexture {
            descriptor: *descriptor,
            backing: Some(TextureBacking {
                base,
                bytes_per_row,
                offset,
            }),
        })
    }

    fn minimum_texture_buffer_alignment(&self, format: GpuPixelFormat) -> usize {
        self.limits
            .texture_buffer_alignment
            .max(format.bytes_per_pixel().unwrap_or(1))
    }

    fn minimum_linear_texture_alignment(&self, _format: GpuPixelFormat) -> usize {
        self.limits.linear_texture_alignment
    }

    fn heap_texture_size_and_align(&self, descriptor: &TextureDescriptor) -> SizeAndAlign {
        let align = self.limits.heap_alignment;
        let size = descriptor
            .format
            .bytes_per_pixel()
            .and_then(|bpp| bpp.checked_mul(descriptor.width))
            .and_then(|row| checked_align_up(row, self.limits.linear_texture_alignment))
            .and_then(|row| row.checked_mul(descriptor.height))
            .and_then(|size| checked_align_up(size, align))
            .unwrap_or(0);
        SizeAndAlign { size, align }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PageAllocation;

    fn buffer(allocation: &PageAllocation) -> HostBuffer {
        let device = HostDevice::default();
        unsafe {
            device
                .new_buffer_no_copy(allocation.as_ptr(), allocation.len(), ResourceOptions::STORAGE_SHARED)
                .unwrap()
        }
    }

    #[test]
    fn test_no_copy_requires_pages() {
        let allocation = PageAllocation::system(8192).unwrap();
        let device = HostDevice::default();
        let err = unsafe { device.new_buffer_no_copy(allocation.as_ptr(), 100, ResourceOptions::STORAGE_SHARED) }
            .unwrap_err();
        assert!(matches!(err, Error::BufferCreationFailed { length: 100, .. }));

        let err = unsafe {
            device.new_buffer_no_copy(allocation.as_ptr(), 4096, ResourceOptions::STORAGE_PRIVATE)
        }
        .unwrap_err();
        assert!(err.is_wrap_error());

        let ok = buffer(&allocation);
        assert_eq!(ok.length(), allocation.len());
        assert_eq!(ok.contents(), allocation.as_ptr());
    }

    #[test]
    fn test_texture_from_buffer() {
        let allocation = PageAllocation::system(16384).unwrap();
        let buffer = buffer(&allocation);
        let device = HostDevice::default();
        let descriptor = TextureDescriptor::new_2d(GpuPixelFormat::Rgba8Unorm, 10, 10);

        let texture = device.new_texture_from_buffer(&buffer, &descriptor, 0, 48).unwrap();
        assert_eq!(texture.bytes_per_row(), Some(48));
        assert_eq!(texture.descriptor().unwrap().base_address(), allocation.as_ptr());

        // 40 bytes of pixels but a stride not aligned to 16
        let err = device.new_texture_from_buffer(&buffer, &descriptor, 0, 40).unwrap_err();
        assert!(matches!(err, Error::TextureCreationFailed { bytes_per_row: 40, .. }));

        let err = device.new_texture_from_buffer(&buffer, &descriptor, 0, 32).unwrap_err();
        assert!(err.to_string().contains("row stride below 40 bytes"));

        let tall = TextureDescriptor::new_2d(GpuPixelFormat::Rgba8Unorm, 10, 1000);
        assert!(device.new_texture_from_buffer(&buffer, &tall, 0, 48).is_err());

        let depth = TextureDescriptor::new_2d(GpuPixelFormat::Depth32Float, 10, 10);
        assert!(device.new_texture_from_buffer(&buffer, &depth, 0, 48).is_err());
    }

    #[test]
    fn test_device_texture_has_no_data() {
        let device = HostDevice::default();
        let descriptor = TextureDescriptor::new_2d(GpuPixelFormat::Bgra8Unorm, 64, 64)
            .with_storage_mode(StorageMode::Private);
        let texture = device.new_texture(&descriptor).unwrap();
        assert!(!texture.has_backing_buffer());
        assert!(matches!(texture.descriptor(), Err(Error::MissingData)));
        assert!(texture.image_buffer_view().unwrap_err().is_missing_data());
    }

    #[test]
    fn test_alignment_queries() {
        let unified = HostDevice::default();
        assert_eq!(unified.minimum_texture_buffer_alignment(GpuPixelFormat::R8Unorm), 16);
        assert_eq!(unified.minimum_texture_buffer_alignment(GpuPixelFormat::Rgba32Float), 16);

        let discrete = HostDevice::new(HostDeviceLimits::discrete());
        assert_eq!(discrete.minimum_linear_texture_alignment(GpuPixelFormat::R8Unorm), 256);

        let heap = unified.heap_texture_size_and_align(&TextureDescriptor::new_2d(GpuPixelFormat::R8Unorm, 40, 40));
        assert_eq!(heap, SizeAndAlign { size: 16384, align: 16384 });
    }
}
