//! Row-stride image-processing buffers.
//!
//! [`ImageBuffer`] is the buffer type CPU pixel filters operate on: a data
//! pointer, height, width and row stride. It never owns its pixels; it is
//! always initialized over memory supplied by someone else.
//!
//! The alignment an image-processing library wants for a buffer is not a
//! constant. [`ImageBuffer::required_layout`] reports it for a given geometry
//! without allocating anything, which is how the shared buffer manager
//! discovers the row alignment before it allocates.

use std::fmt;
use std::ptr::NonNull;

use crate::descriptor::{checked_align_up, RectangularDataDescriptor};
use crate::provider::DescriptorProvider;
use crate::{Error, Result};

/// Row alignment for rows of at least [`WIDE_ROW_BYTES`].
pub const WIDE_ROW_ALIGNMENT: usize = 64;

/// Row alignment for narrow rows.
pub const NARROW_ROW_ALIGNMENT: usize = 16;

/// Rows this wide or wider are aligned to a cache line.
pub const WIDE_ROW_BYTES: usize = 64;

/// Alignment and row stride an image buffer of a given geometry prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBufferLayout {
    /// Required row-stride alignment in bytes.
    pub alignment: usize,
    /// Row stride that satisfies `alignment`.
    pub row_bytes: usize,
}

/// Non-owning row-stride image buffer.
pub struct ImageBuffer {
    data: NonNull<u8>,
    height: usize,
    width: usize,
    row_bytes: usize,
}

// Plain pointer plus geometry, like the C struct it models.
unsafe impl Send for ImageBuffer {}
unsafe impl Sync for ImageBuffer {}

impl ImageBuffer {
    /// Reports the layout a buffer of this geometry needs, without allocating.
    ///
    /// `bits_per_pixel` is the size of one pixel as the library sees it.
    pub fn required_layout(height: usize, width: usize, bits_per_pixel: usize) -> Result<ImageBufferLayout> {
        if height == 0 || width == 0 || bits_per_pixel == 0 {
            return Err(Error::invalid_dimensions(width, height, "zero extent or pixel size"));
        }
        let row = width
            .checked_mul(bits_per_pixel)
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| Error::invalid_dimensions(width, height, "row size overflow"))?;
        let alignment = if row >= WIDE_ROW_BYTES {
            WIDE_ROW_ALIGNMENT
        } else {
            NARROW_ROW_ALIGNMENT
        };
        let row_bytes = checked_align_up(row, alignment)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "row size overflow"))?;
        Ok(ImageBufferLayout { alignment, row_bytes })
    }

    /// Initializes a buffer over caller-supplied memory.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads and writes of `row_bytes * height`
    /// bytes for as long as the buffer is used.
    #[inline]
    pub unsafe fn from_raw_parts(data: NonNull<u8>, height: usize, width: usize, row_bytes: usize) -> Self {
        Self {
            data,
            height,
            width,
            row_bytes,
        }
    }

    /// Pixel data address.
    #[inline]
    pub fn data(&self) -> NonNull<u8> {
        self.data
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row stride in bytes.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// All rows, stride padding included.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: guaranteed by `from_raw_parts`.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.row_bytes * self.height) }
    }

    /// All rows, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: guaranteed by `from_raw_parts`; `&mut self` excludes other
        // borrows through this buffer.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.row_bytes * self.height) }
    }

    /// Row `y` including its padding.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        (y < self.height).then(|| &self.as_bytes()[y * self.row_bytes..(y + 1) * self.row_bytes])
    }

    /// Row `y` including its padding, mutably.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let row_bytes = self.row_bytes;
        Some(&mut self.as_bytes_mut()[y * row_bytes..(y + 1) * row_bytes])
    }

    /// Iterates rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.as_bytes().chunks_exact(self.row_bytes.max(1)).take(self.height)
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("data", &self.data)
            .field("height", &self.height)
            .field("width", &self.width)
            .field("row_bytes", &self.row_bytes)
            .finish()
    }
}

impl DescriptorProvider for ImageBuffer {
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        // SAFETY: the buffer's own contract covers the descriptor's.
        Ok(unsafe { RectangularDataDescriptor::from_raw_parts(self.width, self.height, self.data, self.row_bytes) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_layout() {
        // 40 one-byte pixels: narrow row.
        let layout = ImageBuffer::required_layout(40, 40, 8).unwrap();
        assert_eq!(layout, ImageBufferLayout { alignment: 16, row_bytes: 48 });

        // 100 four-byte pixels: wide row.
        let layout = ImageBuffer::required_layout(10, 100, 32).unwrap();
        assert_eq!(layout.alignment, 64);
        assert_eq!(layout.row_bytes, 448);

        // Sub-byte pixels round up.
        let layout = ImageBuffer::required_layout(1, 3, 4).unwrap();
        assert_eq!(layout.row_bytes, 16);
    }

    #[test]
    fn test_required_layout_rejects_zero() {
        let err = ImageBuffer::required_layout(0, 10, 8).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }));
    }

    #[test]
    fn test_rows() {
        let mut pixels: Vec<u8> = (0..48).collect();
        let base = NonNull::new(pixels.as_mut_ptr()).unwrap();
        let mut buffer = unsafe { ImageBuffer::from_raw_parts(base, 3, 10, 16) };
        assert_eq!(buffer.rows().count(), 3);
        assert_eq!(buffer.row(2).unwrap()[0], 32);
        assert!(buffer.row(3).is_none());

        buffer.row_mut(1).unwrap().fill(0xff);
        let sum: usize = buffer.as_bytes().iter().filter(|&&b| b == 0xff).count();
        assert_eq!(sum, 16);
    }

    #[test]
    fn test_descriptor_round_trip() {
        let mut pixels = vec![0u8; 64];
        let base = NonNull::new(pixels.as_mut_ptr()).unwrap();
        let buffer = unsafe { ImageBuffer::from_raw_parts(base, 4, 16, 16) };
        let desc = buffer.descriptor().unwrap();
        assert_eq!(desc.data_length(), 64);
        assert_eq!(desc.base_address(), base);
    }
}
