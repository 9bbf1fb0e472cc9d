//! Host video buffers.
//!
//! [`HostVideoBuffer`] models a platform pixel buffer: either a no-copy
//! wrapper over someone else's memory or a buffer backed by its own
//! [`HostSurface`]. Its base address is only available while locked;
//! readers take a [`BaseAddressLock`] and the lock is released when the
//! guard drops, on every exit path.

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use sgfx_core::interop::{VideoBufferAttributes, VideoBufferFactory};
use sgfx_core::{
    DescriptorProvider, Error, MultiplanarDescriptorProvider, RectangularDataDescriptor, Result, VideoPixelFormat,
};
use tracing::{debug, trace};

use super::surface::{HostSurface, PlaneLayout};

/// Row and base alignment of GPU compatible video buffers.
pub const GPU_COMPATIBLE_ALIGNMENT: usize = 16;

enum Backing {
    Borrowed(NonNull<u8>),
    Surface(HostSurface),
}

/// Platform pixel buffer.
pub struct HostVideoBuffer {
    width: usize,
    height: usize,
    format: VideoPixelFormat,
    bytes_per_row: usize,
    attributes: VideoBufferAttributes,
    backing: Backing,
    lock_count: AtomicUsize,
}

// Borrowed memory is guaranteed by the creator; the lock count is atomic.
unsafe impl Send for HostVideoBuffer {}
unsafe impl Sync for HostVideoBuffer {}

impl HostVideoBuffer {
    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel format.
    #[inline]
    pub fn pixel_format(&self) -> VideoPixelFormat {
        self.format
    }

    /// Row stride; zero for planar buffers.
    #[inline]
    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    /// Compatibility keys the buffer was created with.
    #[inline]
    pub fn attributes(&self) -> &VideoBufferAttributes {
        &self.attributes
    }

    /// Backing surface, when the buffer owns its memory.
    pub fn surface(&self) -> Option<&HostSurface> {
        match &self.backing {
            Backing::Surface(surface) => Some(surface),
            Backing::Borrowed(_) => None,
        }
    }

    /// Whether the buffer has more than one plane.
    #[inline]
    pub fn is_planar(&self) -> bool {
        self.format.is_planar()
    }

    /// Locks the base address until the guard drops.
    pub fn lock_base_address(&self) -> BaseAddressLock<'_> {
        let count = self.lock_count.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(count, "video buffer lock");
        BaseAddressLock { buffer: self }
    }

    /// Number of outstanding locks.
    #[inline]
    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::Acquire)
    }

    /// Whether the base address is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock_count() > 0
    }

    /// Base address; `None` unless locked.
    pub fn base_address(&self) -> Option<NonNull<u8>> {
        if !self.is_locked() {
            return None;
        }
        Some(match &self.backing {
            Backing::Borrowed(ptr) => *ptr,
            Backing::Surface(surface) => surface.base_address(),
        })
    }

    /// Base address of plane `plane`; `None` unless locked and in range.
    pub fn plane_base_address(&self, plane: usize) -> Option<NonNull<u8>> {
        let layout = self.plane_layout(plane)?;
        let base = self.base_address()?;
        // SAFETY: plane offsets lie inside the backing surface.
        Some(unsafe { NonNull::new_unchecked(base.as_ptr().add(layout.offset)) })
    }

    fn plane_layout(&self, plane: usize) -> Option<&PlaneLayout> {
        self.surface()?.plane(plane)
    }
}

impl fmt::Debug for HostVideoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostVideoBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("owned", &self.surface().is_some())
            .field("lock_count", &self.lock_count())
            .finish()
    }
}

/// Scoped base-address lock.
#[must_use = "the lock is released when the guard drops"]
pub struct BaseAddressLock<'a> {
    buffer: &'a HostVideoBuffer,
}

impl Drop for BaseAddressLock<'_> {
    fn drop(&mut self) {
        let count = self.buffer.lock_count.fetch_sub(1, Ordering::AcqRel) - 1;
        trace!(count, "video buffer unlock");
    }
}

impl DescriptorProvider for HostVideoBuffer {
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        let _lock = self.lock_base_address();
        let base = self.base_address().ok_or(Error::MissingData)?;
        if self.width == 0 || self.height == 0 || self.bytes_per_row == 0 {
            return Err(Error::MissingData);
        }
        // SAFETY: the memory covers `bytes_per_row * height` bytes for as
        // long as the buffer lives.
        Ok(unsafe { RectangularDataDescriptor::from_raw_parts(self.width, self.height, base, self.bytes_per_row) })
    }
}

impl MultiplanarDescriptorProvider for HostVideoBuffer {
    fn plane_count(&self) -> usize {
        self.surface().map(|s| s.plane_count()).unwrap_or(0)
    }

    fn plane_descriptor(&self, plane: usize) -> Result<RectangularDataDescriptor<'_>> {
        let _lock = self.lock_base_address();
        let layout = self.plane_layout(plane).ok_or(Error::MissingDataOfPlane(plane))?;
        let base = self.plane_base_address(plane).ok_or(Error::MissingDataOfPlane(plane))?;
        if layout.width == 0 || layout.height == 0 || layout.bytes_per_row == 0 {
            return Err(Error::MissingDataOfPlane(plane));
        }
        // SAFETY: the plane lies inside the surface owned by `self`.
        Ok(unsafe { RectangularDataDescriptor::from_raw_parts(layout.width, layout.height, base, layout.bytes_per_row) })
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Host implementation of [`VideoBufferFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HostVideoFactory;

impl HostVideoFactory {
    /// Creates a buffer that owns a fresh surface, packed or planar.
    pub fn create(&self, width: usize, height: usize, format: VideoPixelFormat) -> Result<HostVideoBuffer> {
        let surface = HostSurface::new(width, height, format)?;
        let bytes_per_row = surface.bytes_per_row();
        debug!(width, height, %format, surface = surface.id(), "video buffer");
        Ok(HostVideoBuffer {
            width,
            height,
            format,
            bytes_per_row,
            attributes: VideoBufferAttributes::interop(),
            backing: Backing::Surface(surface),
            lock_count: AtomicUsize::new(0),
        })
    }
}

impl VideoBufferFactory for HostVideoFactory {
    type VideoBuffer = HostVideoBuffer;

    unsafe fn create_no_copy(
        &self,
        width: usize,
        height: usize,
        format: VideoPixelFormat,
        ptr: NonNull<u8>,
        bytes_per_row: usize,
        attributes: &VideoBufferAttributes,
    ) -> Result<HostVideoBuffer> {
        let fail = |reason: String| Error::video_buffer_creation_failed(format, bytes_per_row, reason);
        let bpp = format
            .bytes_per_pixel()
            .ok_or_else(|| fail("no-copy wrapping needs a packed format".into()))?;
        if width == 0 || height == 0 {
            return Err(fail(format!("empty buffer {width}x{height}")));
        }
        let row = width
            .checked_mul(bpp)
            .ok_or_else(|| fail("row size overflows".into()))?;
        if bytes_per_row < row {
            return Err(fail(format!("row stride below {row} bytes")));
        }
        if attributes.gpu_compatible
            && (bytes_per_row % GPU_COMPATIBLE_ALIGNMENT != 0 || ptr.as_ptr() as usize % GPU_COMPATIBLE_ALIGNMENT != 0)
        {
            return Err(fail(format!(
                "GPU compatible buffers need {GPU_COMPATIBLE_ALIGNMENT} byte aligned rows"
            )));
        }
        trace!(width, height, %format, bytes_per_row, "no-copy video buffer");
        Ok(HostVideoBuffer {
            width,
            height,
            format,
            bytes_per_row,
            attributes: *attributes,
            backing: Backing::Borrowed(ptr),
            lock_count: AtomicUsize::new(0),
        })
    }
}
