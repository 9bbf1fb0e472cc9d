//! Immutable bitmap images.
//!
//! A [`BitmapImage`] is decoded pixel data that no longer changes: the
//! snapshot of a drawing surface, or pixels handed over by a decoder. Its
//! storage is reference counted so clones share the same bytes, and it is a
//! [`DescriptorProvider`] like every other pixel resource.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::descriptor::RectangularDataDescriptor;
use crate::format::{BitmapInfo, ColorSpace, GpuPixelFormat};
use crate::provider::DescriptorProvider;
use crate::surface::DrawingSurface;
use crate::{Error, Result};

/// Read-only bitmap with shared storage.
#[derive(Clone)]
pub struct BitmapImage {
    data: Arc<[u8]>,
    width: usize,
    height: usize,
    bytes_per_row: usize,
    format: GpuPixelFormat,
    bitmap_info: Option<BitmapInfo>,
    color_space: Option<ColorSpace>,
}

impl BitmapImage {
    /// Wraps decoded pixels.
    ///
    /// `data` must hold at least `bytes_per_row * height` bytes and each row
    /// must fit `width` pixels of `format`.
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        width: usize,
        height: usize,
        bytes_per_row: usize,
        format: GpuPixelFormat,
    ) -> Result<Self> {
        let data = data.into();
        let bytes_per_pixel = format
            .bytes_per_pixel()
            .ok_or_else(|| Error::unsupported_format(format.name()))?;
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "empty image"));
        }
        let row = width
            .checked_mul(bytes_per_pixel)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "row size overflow"))?;
        if bytes_per_row < row {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("row stride {bytes_per_row} below {row} bytes"),
            ));
        }
        let required = bytes_per_row
            .checked_mul(height)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "image size overflow"))?;
        if data.len() < required {
            return Err(Error::out_of_bounds(required, data.len()));
        }
        Ok(Self {
            data,
            width,
            height,
            bytes_per_row,
            format,
            bitmap_info: format.bitmap_info(),
            color_space: format.default_color_space(),
        })
    }

    /// Copies the current contents of a drawing surface.
    pub fn snapshot(surface: &DrawingSurface) -> Self {
        Self {
            data: Arc::from(surface.as_bytes()),
            width: surface.width(),
            height: surface.height(),
            bytes_per_row: surface.bytes_per_row(),
            format: surface.format(),
            bitmap_info: Some(surface.bitmap_info()),
            color_space: Some(surface.color_space()),
        }
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

    /// Pixel format.
    #[inline]
    pub fn format(&self) -> GpuPixelFormat {
        self.format
    }

    /// Component layout, when the format has one.
    #[inline]
    pub fn bitmap_info(&self) -> Option<BitmapInfo> {
        self.bitmap_info
    }

    /// Color space, when known.
    #[inline]
    pub fn color_space(&self) -> Option<ColorSpace> {
        self.color_space
    }

    /// Pixel bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Row `y` including padding.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        (y < self.height).then(|| &self.data[y * self.bytes_per_row..(y + 1) * self.bytes_per_row])
    }
}

impl fmt::Debug for BitmapImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("format", &self.format)
            .finish()
    }
}

impl DescriptorProvider for BitmapImage {
    /// Views derived from an image are for reading; the pixels are shared.
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        let base = NonNull::from(&*self.data).cast::<u8>();
        // SAFETY: `new` checked the length; the Arc keeps the bytes alive
        // while `self` is borrowed.
        Ok(unsafe { RectangularDataDescriptor::from_raw_parts(self.width, self.height, base, self.bytes_per_row) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect;
    use crate::surface::Color;

    #[test]
    fn test_new_validates_length() {
        let err = BitmapImage::new(vec![0u8; 100], 10, 10, 16, GpuPixelFormat::R8Unorm).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { required: 160, available: 100 }));

        let err = BitmapImage::new(vec![0u8; 100], 10, 10, 8, GpuPixelFormat::R8Unorm).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }));

        let err = BitmapImage::new(vec![0u8; 100], 1, 1, 16, GpuPixelFormat::Bc1Rgba).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPixelFormat { .. }));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut surface = DrawingSurface::new(8, 8, GpuPixelFormat::R8Unorm).unwrap();
        surface.fill_rect(Rect::new(0, 0, 8, 1), Color::WHITE);
        let image = BitmapImage::snapshot(&surface);
        surface.clear();

        assert_eq!(image.row(0).unwrap()[..8], [255u8; 8]);
        assert_eq!(image.color_space(), Some(ColorSpace::Gray));
    }

    #[test]
    fn test_descriptor_shares_storage() {
        let image = BitmapImage::new(vec![3u8; 64], 4, 4, 16, GpuPixelFormat::Bgra8Unorm).unwrap();
        let clone = image.clone();
        let a = image.descriptor().unwrap();
        let b = clone.descriptor().unwrap();
        assert_eq!(a.base_address(), b.base_address());
        assert_eq!(image.image_buffer_view().unwrap().row(3).unwrap()[0], 3);
    }
}
