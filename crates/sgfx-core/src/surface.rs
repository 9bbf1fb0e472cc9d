//! CPU drawing surfaces.
//!
//! [`DrawingSurface`] is a bitmap context: a rasterization target laid out
//! by a [`BitmapInfo`] and interpreted in a [`ColorSpace`]. It either owns
//! its pixels ([`DrawingSurface::new`]) or draws straight into memory shared
//! with other views ([`DrawingSurface::from_raw_parts`]).
//!
//! Drawing is limited to solid fills. Each covered row is an independent
//! slice, so fills run row-parallel with rayon.
//!
//! # Pixel encoding
//!
//! A [`Color`] is converted to the surface layout as follows:
//! 1. Gray surfaces take Rec.709 luminance (exact when r == g == b)
//! 2. Color components are premultiplied when the alpha info says so
//! 3. Non-extended color spaces clamp to [0, 1]
//! 4. Components are written as unorm integers or little-endian floats,
//!    with 8-bit components word-swapped for 32-bit little-endian order
//!
//! # Example
//!
//! ```rust
//! use sgfx_core::{Color, DrawingSurface, GpuPixelFormat, Rect};
//!
//! let mut surface = DrawingSurface::new(4, 4, GpuPixelFormat::Bgra8Unorm).unwrap();
//! surface.fill_rect(Rect::new(1, 1, 2, 2), Color::rgb(1.0, 0.0, 0.0));
//! assert_eq!(surface.pixel(1, 1).unwrap(), &[0, 0, 255, 255]);
//! assert_eq!(surface.pixel(0, 0).unwrap(), &[0, 0, 0, 0]);
//! ```

use std::fmt;
use std::ptr::NonNull;

use half::f16;
use rayon::prelude::*;
use tracing::trace;

use crate::descriptor::{checked_align_up, RectangularDataDescriptor};
use crate::format::{BitmapInfo, ByteOrder, ColorSpace, GpuPixelFormat};
use crate::provider::DescriptorProvider;
use crate::rect::Rect;
use crate::{Error, Result};

/// Rec.709 luminance coefficient for red.
pub const REC709_LUMA_R: f32 = 0.2126;
/// Rec.709 luminance coefficient for green.
pub const REC709_LUMA_G: f32 = 0.7152;
/// Rec.709 luminance coefficient for blue.
pub const REC709_LUMA_B: f32 = 0.0722;

/// Row alignment of surfaces that allocate their own pixels.
pub const OWNED_ROW_ALIGNMENT: usize = 16;

/// Rec.709 luminance of a linear RGB triple.
#[inline]
pub fn luminance_rec709(rgb: [f32; 3]) -> f32 {
    rgb[0] * REC709_LUMA_R + rgb[1] * REC709_LUMA_G + rgb[2] * REC709_LUMA_B
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    /// Transparent black.
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Color with explicit alpha.
    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Opaque gray.
    #[inline]
    pub const fn gray(value: f32) -> Self {
        Self::rgb(value, value, value)
    }

    /// Gray level of this color.
    #[inline]
    pub fn luminance(&self) -> f32 {
        if self.r == self.g && self.g == self.b {
            self.r
        } else {
            luminance_rec709([self.r, self.g, self.b])
        }
    }
}

/// One encoded pixel.
#[derive(Clone, Copy)]
struct PixelBytes {
    bytes: [u8; 16],
    len: usize,
}

impl PixelBytes {
    fn push(&mut self, src: &[u8]) {
        self.bytes[self.len..self.len + src.len()].copy_from_slice(src);
        self.len += src.len();
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Bitmap drawing context over pixel memory.
pub struct DrawingSurface {
    data: NonNull<u8>,
    width: usize,
    height: usize,
    bytes_per_row: usize,
    format: GpuPixelFormat,
    bits_per_component: usize,
    bits_per_pixel: usize,
    bitmap_info: BitmapInfo,
    color_space: ColorSpace,
    // Length of the self-allocated storage, if the surface owns `data`.
    owned_len: Option<usize>,
}

// Writes require `&mut self`; the pointer itself carries no thread affinity.
unsafe impl Send for DrawingSurface {}
unsafe impl Sync for DrawingSurface {}

impl DrawingSurface {
    /// Allocates a zeroed surface in the format's default color space.
    pub fn new(width: usize, height: usize, format: GpuPixelFormat) -> Result<Self> {
        let bytes_per_pixel = format.bytes_per_pixel().ok_or_else(|| {
            Error::drawing_surface_creation_failed(format, 0, "format has no per-pixel size")
        })?;
        let bytes_per_row = width
            .checked_mul(bytes_per_pixel)
            .and_then(|row| checked_align_up(row, OWNED_ROW_ALIGNMENT))
            .ok_or_else(|| Error::invalid_dimensions(width, height, "row size overflow"))?;
        let len = bytes_per_row
            .checked_mul(height)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "surface size overflow"))?;
        let facts = SurfaceFacts::resolve(width, height, bytes_per_row, format, None)?;

        let storage: Box<[u8]> = vec![0u8; len].into_boxed_slice();
        let data = NonNull::from(Box::leak(storage)).cast::<u8>();
        Ok(Self::assemble(data, width, height, bytes_per_row, format, facts, Some(len)))
    }

    /// Creates a surface drawing into existing memory.
    ///
    /// `color_space` overrides the format's default. Fails with
    /// [`Error::DrawingSurfaceCreationFailed`] when the format has no bitmap
    /// layout, the row stride is too small, or the color space does not fit
    /// the format's components.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads and writes of `bytes_per_row * height`
    /// bytes for the lifetime of the surface.
    pub unsafe fn from_raw_parts(
        data: NonNull<u8>,
        width: usize,
        height: usize,
        bytes_per_row: usize,
        format: GpuPixelFormat,
        color_space: Option<ColorSpace>,
    ) -> Result<Self> {
        let facts = SurfaceFacts::resolve(width, height, bytes_per_row, format, color_space)?;
        Ok(Self::assemble(data, width, height, bytes_per_row, format, facts, None))
    }

    fn assemble(
        data: NonNull<u8>,
        width: usize,
        height: usize,
        bytes_per_row: usize,
        format: GpuPixelFormat,
        facts: SurfaceFacts,
        owned_len: Option<usize>,
    ) -> Self {
        trace!(width, height, bytes_per_row, %format, owned = owned_len.is_some(), "drawing surface");
        Self {
            data,
            width,
            height,
            bytes_per_row,
            format,
            bits_per_component: facts.bits_per_component,
            bits_per_pixel: facts.bits_per_pixel,
            bitmap_info: facts.bitmap_info,
            color_space: facts.color_space,
            owned_len,
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

    /// Pixel format the surface was laid out for.
    #[inline]
    pub fn format(&self) -> GpuPixelFormat {
        self.format
    }

    /// Bits per component.
    #[inline]
    pub fn bits_per_component(&self) -> usize {
        self.bits_per_component
    }

    /// Bits per pixel.
    #[inline]
    pub fn bits_per_pixel(&self) -> usize {
        self.bits_per_pixel
    }

    /// Component layout.
    #[inline]
    pub fn bitmap_info(&self) -> BitmapInfo {
        self.bitmap_info
    }

    /// Color space.
    #[inline]
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Address of the first row.
    #[inline]
    pub fn data(&self) -> NonNull<u8> {
        self.data
    }

    /// All rows, stride padding included.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: valid for `bytes_per_row * height` bytes by construction.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.bytes_per_row * self.height) }
    }

    /// All rows, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` excludes other borrows of the surface.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.bytes_per_row * self.height) }
    }

    /// Encoded bytes of the pixel at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.bits_per_pixel / 8;
        let start = y * self.bytes_per_row + x * bpp;
        Some(&self.as_bytes()[start..start + bpp])
    }

    /// Fills `rect` (clipped to the surface) with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = rect.clamp_to(self.width, self.height) else {
            return;
        };
        let pixel = self.encode(color);
        let bpp = pixel.len;
        let bpr = self.bytes_per_row;
        let (start, end) = (rect.x * bpp, rect.right() * bpp);
        trace!(%rect, bytes_per_pixel = bpp, "fill_rect");

        let rows = &mut self.as_bytes_mut()[rect.y * bpr..rect.bottom() * bpr];
        rows.par_chunks_mut(bpr).for_each(|row| {
            for px in row[start..end].chunks_exact_mut(bpp) {
                px.copy_from_slice(pixel.as_slice());
            }
        });
    }

    /// Fills the whole surface.
    pub fn fill(&mut self, color: Color) {
        self.fill_rect(Rect::from_size(self.width, self.height), color);
    }

    /// Resets every byte to zero (transparent black).
    pub fn clear(&mut self) {
        let bytes_per_row = self.bytes_per_row;
        self.as_bytes_mut().par_chunks_mut(bytes_per_row).for_each(|row| row.fill(0));
    }

    fn encode(&self, color: Color) -> PixelBytes {
        let info = self.bitmap_info;
        let extended = self.color_space.is_extended();
        let alpha = color.a.clamp(0.0, 1.0);
        let scale = if info.alpha.is_premultiplied() { alpha } else { 1.0 };
        let limit = |v: f32| if extended { v } else { v.clamp(0.0, 1.0) };

        let gray = [color.luminance()];
        let rgb = [color.r, color.g, color.b];
        let channels: &[f32] = if self.color_space.component_count() == 1 { &gray } else { &rgb };

        let mut values = [0.0f32; 4];
        let mut count = 0;
        if info.alpha.has_alpha() && info.alpha.is_first() {
            values[count] = alpha;
            count += 1;
        }
        for &c in channels {
            values[count] = limit(c) * scale;
            count += 1;
        }
        if info.alpha.has_alpha() && !info.alpha.is_first() {
            values[count] = alpha;
            count += 1;
        }

        let mut pixel = PixelBytes { bytes: [0; 16], len: 0 };
        for &v in &values[..count] {
            match (info.float_components, self.bits_per_component) {
                (true, 16) => pixel.push(&f16::from_f32(v).to_le_bytes()),
                (true, _) => pixel.push(&v.to_le_bytes()),
                (false, 16) => pixel.push(&((v.clamp(0.0, 1.0) * 65535.0).round() as u16).to_le_bytes()),
                (false, _) => pixel.push(&[(v.clamp(0.0, 1.0) * 255.0).round() as u8]),
            }
        }
        if info.byte_order == ByteOrder::Little32 && self.bits_per_component == 8 {
            pixel.bytes[..4].reverse();
        }
        pixel
    }
}

impl Drop for DrawingSurface {
    fn drop(&mut self) {
        if let Some(len) = self.owned_len {
            let slice = std::ptr::slice_from_raw_parts_mut(self.data.as_ptr(), len);
            // SAFETY: `data` came from `Box::leak` of a `len`-byte box in `new`.
            drop(unsafe { Box::from_raw(slice) });
        }
    }
}

impl fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("format", &self.format)
            .field("bitmap_info", &self.bitmap_info)
            .field("color_space", &self.color_space)
            .finish()
    }
}

impl DescriptorProvider for DrawingSurface {
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        // SAFETY: the surface keeps its memory valid while borrowed.
        Ok(unsafe {
            RectangularDataDescriptor::from_raw_parts(self.width, self.height, self.data, self.bytes_per_row)
        })
    }
}

/// Layout facts checked before a surface is built.
struct SurfaceFacts {
    bits_per_component: usize,
    bits_per_pixel: usize,
    bitmap_info: BitmapInfo,
    color_space: ColorSpace,
}

impl SurfaceFacts {
    fn resolve(
        width: usize,
        height: usize,
        bytes_per_row: usize,
        format: GpuPixelFormat,
        color_space: Option<ColorSpace>,
    ) -> Result<Self> {
        let fail = |reason: String| Error::drawing_surface_creation_failed(format, bytes_per_row, reason);

        let (Some(bitmap_info), Some(bits_per_component), Some(bits_per_pixel), Some(components)) = (
            format.bitmap_info(),
            format.bits_per_component(),
            format.bits_per_pixel(),
            format.component_count(),
        ) else {
            return Err(fail("format has no bitmap layout".into()));
        };
        let color_space = color_space
            .or(format.default_color_space())
            .ok_or_else(|| fail("format has no default color space".into()))?;

        if width == 0 || height == 0 {
            return Err(fail(format!("empty surface {width}x{height}")));
        }
        let min_row = width * bits_per_pixel / 8;
        if bytes_per_row < min_row {
            return Err(fail(format!("row needs at least {min_row} bytes")));
        }
        let slots = color_space.component_count() + usize::from(bitmap_info.alpha.has_alpha());
        if slots != components {
            return Err(fail(format!(
                "{color_space:?} with {:?} alpha fills {slots} components, format has {components}",
                bitmap_info.alpha
            )));
        }
        if color_space.is_extended() && !bitmap_info.float_components {
            return Err(fail(format!("{color_space:?} needs float components")));
        }

        Ok(Self {
            bits_per_component,
            bits_per_pixel,
            bitmap_info,
            color_space,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_luminance() {
        assert_relative_eq!(luminance_rec709([1.0, 1.0, 1.0]), 1.0, epsilon = 1e-6);
        assert_relative_eq!(Color::rgb(1.0, 0.0, 0.0).luminance(), REC709_LUMA_R);
        assert_eq!(Color::gray(1.0 / 255.0).luminance(), 1.0 / 255.0);
    }

    #[test]
    fn test_gray_fill_sum() {
        let mut surface = DrawingSurface::new(40, 40, GpuPixelFormat::R8Unorm).unwrap();
        surface.fill(Color::BLACK);
        surface.fill_rect(Rect::new(10, 10, 20, 20), Color::gray(1.0 / 255.0));
        let sum: u32 = surface.as_bytes().iter().map(|&b| b as u32).sum();
        assert_eq!(sum, 400);
    }

    #[test]
    fn test_bgra_byte_order() {
        let mut surface = DrawingSurface::new(2, 2, GpuPixelFormat::Bgra8Unorm).unwrap();
        surface.fill(Color::rgb(1.0, 0.5, 0.0));
        assert_eq!(surface.pixel(1, 1).unwrap(), &[0, 128, 255, 255]);
    }

    #[test]
    fn test_rgba_premultiplied() {
        let mut surface = DrawingSurface::new(1, 1, GpuPixelFormat::Rgba8Unorm).unwrap();
        surface.fill(Color::rgba(1.0, 1.0, 1.0, 0.5));
        assert_eq!(surface.pixel(0, 0).unwrap(), &[128, 128, 128, 128]);
    }

    #[test]
    fn test_half_float_white() {
        let mut surface = DrawingSurface::new(3, 1, GpuPixelFormat::R16Float).unwrap();
        surface.fill(Color::WHITE);
        let values: Vec<f16> = surface.as_bytes()[..6]
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(values, vec![f16::ONE; 3]);
    }

    #[test]
    fn test_extended_range_survives() {
        let mut surface = DrawingSurface::new(1, 1, GpuPixelFormat::Rgba32Float).unwrap();
        surface.fill(Color::rgb(2.0, 0.0, 0.0));
        let values: Vec<f32> = surface
            .pixel(0, 0)
            .unwrap()
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_fill_outside_is_noop() {
        let mut surface = DrawingSurface::new(4, 4, GpuPixelFormat::R8Unorm).unwrap();
        surface.fill_rect(Rect::new(10, 10, 5, 5), Color::WHITE);
        assert!(surface.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clear() {
        let mut surface = DrawingSurface::new(4, 4, GpuPixelFormat::Rgba8Unorm).unwrap();
        surface.fill(Color::WHITE);
        surface.clear();
        assert!(surface.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rejects_signed_format() {
        let err = DrawingSurface::new(4, 4, GpuPixelFormat::Rg8Snorm).unwrap_err();
        assert!(matches!(err, Error::DrawingSurfaceCreationFailed { .. }));
    }

    #[test]
    fn test_gray_alpha_premultiplied() {
        let mut surface = DrawingSurface::new(2, 1, GpuPixelFormat::Rg8Unorm).unwrap();
        surface.fill(Color::rgba(1.0, 1.0, 1.0, 0.5));
        assert_eq!(surface.pixel(1, 0).unwrap(), &[128, 128]);
    }

    #[test]
    fn test_rejects_mismatched_color_space() {
        let mut pixels = vec![0u8; 64];
        let base = NonNull::new(pixels.as_mut_ptr()).unwrap();
        let err = unsafe {
            DrawingSurface::from_raw_parts(base, 4, 4, 16, GpuPixelFormat::R8Unorm, Some(ColorSpace::Srgb))
        }
        .unwrap_err();
        assert!(err.is_wrap_error());
    }

    #[test]
    fn test_rejects_short_stride() {
        let mut pixels = vec![0u8; 64];
        let base = NonNull::new(pixels.as_mut_ptr()).unwrap();
        let err = unsafe { DrawingSurface::from_raw_parts(base, 8, 2, 16, GpuPixelFormat::Bgra8Unorm, None) }
            .unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_descriptor() {
        let surface = DrawingSurface::new(10, 3, GpuPixelFormat::Bgra8Unorm).unwrap();
        let desc = surface.descriptor().unwrap();
        assert_eq!(desc.bytes_per_row(), 48);
        assert_eq!(desc.data_length(), 144);
    }
}
