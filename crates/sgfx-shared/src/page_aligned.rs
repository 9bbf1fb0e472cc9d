//! Page-aligned copies of pixel resources.
//!
//! GPU buffers can only wrap memory that starts on a page and spans whole
//! pages. [`PageAlignedImage`] copies any [`DescriptorProvider`] into such
//! memory once, after which every derived view, including
//! [`gpu_buffer_view`](DescriptorProvider::gpu_buffer_view), is zero-copy.

use std::fmt;
use std::ptr;

use sgfx_core::interop::PageAllocator;
use sgfx_core::{DescriptorProvider, Error, RectangularDataDescriptor, Result};
use tracing::debug;

use crate::memory::{PageAllocation, SystemPageAllocator};

/// Pixel rows copied into a page-aligned, page-multiple allocation.
pub struct PageAlignedImage<A: PageAllocator = SystemPageAllocator> {
    width: usize,
    height: usize,
    bytes_per_row: usize,
    allocation: PageAllocation<A>,
}

impl<A: PageAllocator> PageAlignedImage<A> {
    /// Copies `provider` into memory from `allocator`.
    ///
    /// The row stride is kept; the tail up to the next page is zeroed.
    pub fn copy_from<P: DescriptorProvider>(provider: &P, allocator: A) -> Result<Self> {
        let source = provider.descriptor()?;
        let length = source.data_length();
        if length == 0 {
            return Err(Error::MissingData);
        }
        let allocation = PageAllocation::new(allocator, length)?;
        // SAFETY: the source is valid for `length` bytes while `provider` is
        // borrowed; the allocation is fresh and at least `length` bytes.
        unsafe { ptr::copy_nonoverlapping(source.base_address().as_ptr(), allocation.as_ptr().as_ptr(), length) };
        debug!(
            width = source.width(),
            height = source.height(),
            bytes_per_row = source.bytes_per_row(),
            size = allocation.len(),
            "page-aligned copy"
        );
        Ok(Self {
            width: source.width(),
            height: source.height(),
            bytes_per_row: source.bytes_per_row(),
            allocation,
        })
    }

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

    /// Row stride in bytes.
    #[inline]
    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    /// Allocated bytes, a whole number of pages.
    #[inline]
    pub fn allocation_size(&self) -> usize {
        self.allocation.len()
    }

    /// Copied rows.
    pub fn as_bytes(&self) -> &[u8] {
        &self.allocation.as_slice()[..self.bytes_per_row * self.height]
    }

    /// Descriptor over the whole allocation, rows extended to cover the
    /// page padding, so it can be wrapped as a GPU buffer.
    ///
    /// `None` when the allocation is not a whole number of rows.
    pub fn padded_descriptor(&self) -> Option<RectangularDataDescriptor<'_>> {
        let len = self.allocation.len();
        (self.bytes_per_row != 0 && len % self.bytes_per_row == 0).then(|| {
            // SAFETY: covers exactly the allocation, borrowed from `self`.
            unsafe {
                RectangularDataDescriptor::from_raw_parts(
                    self.width,
                    len / self.bytes_per_row,
                    self.allocation.as_ptr(),
                    self.bytes_per_row,
                )
            }
        })
    }
}

impl<A: PageAllocator> DescriptorProvider for PageAlignedImage<A> {
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        // SAFETY: the copied rows live in the allocation owned by `self`.
        Ok(unsafe {
            RectangularDataDescriptor::from_raw_parts(
                self.width,
                self.height,
                self.allocation.as_ptr(),
                self.bytes_per_row,
            )
        })
    }
}

impl<A: PageAllocator> fmt::Debug for PageAlignedImage<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAlignedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("allocation", &self.allocation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostDevice;
    use crate::memory::page_size;
    use sgfx_core::interop::GpuBuffer;
    use sgfx_core::{BitmapImage, GpuPixelFormat};

    #[test]
    fn test_copy_is_page_aligned() {
        let pixels: Vec<u8> = (0..=255u8).cycle().take(64 * 10).collect();
        let image = BitmapImage::new(pixels.clone(), 16, 10, 64, GpuPixelFormat::Bgra8Unorm).unwrap();
        let copy = PageAlignedImage::copy_from(&image, SystemPageAllocator).unwrap();

        let descriptor = copy.descriptor().unwrap();
        assert!(descriptor.is_page_aligned(page_size()));
        assert_eq!(copy.allocation_size() % page_size(), 0);
        assert_eq!(copy.as_bytes(), &pixels[..]);
        assert_ne!(descriptor.base_address(), image.descriptor().unwrap().base_address());
    }

    #[test]
    fn test_padded_descriptor_wraps_as_gpu_buffer() {
        let image = BitmapImage::new(vec![7u8; 64 * 10], 16, 10, 64, GpuPixelFormat::Bgra8Unorm).unwrap();
        let copy = PageAlignedImage::copy_from(&image, SystemPageAllocator).unwrap();
        let device = HostDevice::default();

        // 640 bytes of rows is not a whole page
        assert!(matches!(
            copy.gpu_buffer_view(&device),
            Err(Error::BufferSizeNotPageAligned { length: 640 })
        ));

        let padded = copy.padded_descriptor().unwrap();
        let buffer = padded.gpu_buffer_view(&device).unwrap();
        assert_eq!(buffer.length(), copy.allocation_size());
        assert_eq!(buffer.contents(), copy.descriptor().unwrap().base_address());
    }
}
