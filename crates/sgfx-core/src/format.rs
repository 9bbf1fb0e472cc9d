//! Pixel format compatibility table.
//!
//! This module provides the canonical definitions for pixel formats shared
//! between the GPU and the platform video pipeline, plus the per-format
//! facts every other module derives its layout from.
//!
//! # Types
//!
//! - [`GpuPixelFormat`] - GPU-native pixel format
//! - [`VideoPixelFormat`] - Platform video pixel format (FourCC identified)
//! - [`BitmapInfo`] - Component layout of a CPU drawing surface
//! - [`ColorSpace`] - Color space a drawing surface interprets pixels in
//!
//! # Usage
//!
//! ```rust
//! use sgfx_core::format::{GpuPixelFormat, VideoPixelFormat};
//!
//! let gpu = GpuPixelFormat::Bgra8Unorm;
//! assert_eq!(gpu.bytes_per_pixel(), Some(4));
//! assert_eq!(gpu.bits_per_component(), Some(8));
//! assert_eq!(gpu.to_video_format(), Some(VideoPixelFormat::Bgra32));
//! assert_eq!(VideoPixelFormat::Bgra32.to_gpu_format(), Some(gpu));
//! ```
//!
//! # Missing mappings
//!
//! Every lookup returns `Option`. A missing mapping is never replaced by a
//! "close enough" format; callers turn `None` into
//! [`Error::UnsupportedPixelFormat`](crate::Error::UnsupportedPixelFormat).
//!
//! sRGB-encoded GPU formats have no direct video mapping so that
//! `to_gpu_format(to_video_format(f)) == f` holds for every mapped format.
//! Use [`GpuPixelFormat::compatible_video_format`] to get the video format
//! sharing the memory layout of an sRGB texture.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// GPU-native pixel format.
///
/// Names follow the GPU API convention (`rgba8Unorm`, `r16Float`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum GpuPixelFormat {
    // 8-bit
    A8Unorm,
    R8Unorm,
    R8UnormSrgb,
    R8Snorm,
    R8Uint,
    R8Sint,
    // 16-bit
    R16Unorm,
    R16Snorm,
    R16Uint,
    R16Sint,
    R16Float,
    Rg8Unorm,
    Rg8UnormSrgb,
    Rg8Snorm,
    Rg8Uint,
    Rg8Sint,
    // packed 16-bit
    B5g6r5Unorm,
    A1bgr5Unorm,
    Abgr4Unorm,
    Bgr5a1Unorm,
    // 32-bit
    R32Uint,
    R32Sint,
    R32Float,
    Rg16Unorm,
    Rg16Snorm,
    Rg16Uint,
    Rg16Sint,
    Rg16Float,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    // packed 32-bit
    Rgb10a2Unorm,
    Rgb10a2Uint,
    Rg11b10Float,
    Rgb9e5Float,
    Bgr10a2Unorm,
    Bgr10Xr,
    Bgr10XrSrgb,
    // 64-bit
    Rg32Uint,
    Rg32Sint,
    Rg32Float,
    Rgba16Unorm,
    Rgba16Snorm,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Float,
    Bgra10Xr,
    Bgra10XrSrgb,
    // 128-bit
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
    // depth / stencil
    Depth16Unorm,
    Depth32Float,
    Stencil8,
    Depth32FloatStencil8,
    // block compressed and subsampled
    Bc1Rgba,
    Bc3Rgba,
    Bc7RgbaUnorm,
    Astc4x4Ldr,
    Etc2Rgb8,
    Gbgr422,
    Bgrg422,
}

impl GpuPixelFormat {
    /// Every GPU pixel format, in declaration order.
    pub const ALL: [GpuPixelFormat; 66] = {
        use GpuPixelFormat::*;
        [
            A8Unorm, R8Unorm, R8UnormSrgb, R8Snorm, R8Uint, R8Sint, R16Unorm, R16Snorm,
            R16Uint, R16Sint, R16Float, Rg8Unorm, Rg8UnormSrgb, Rg8Snorm, Rg8Uint, Rg8Sint,
            B5g6r5Unorm, A1bgr5Unorm, Abgr4Unorm, Bgr5a1Unorm, R32Uint, R32Sint, R32Float,
            Rg16Unorm, Rg16Snorm, Rg16Uint, Rg16Sint, Rg16Float, Rgba8Unorm, Rgba8UnormSrgb,
            Rgba8Snorm, Rgba8Uint, Rgba8Sint, Bgra8Unorm, Bgra8UnormSrgb, Rgb10a2Unorm,
            Rgb10a2Uint, Rg11b10Float, Rgb9e5Float, Bgr10a2Unorm, Bgr10Xr, Bgr10XrSrgb,
            Rg32Uint, Rg32Sint, Rg32Float, Rgba16Unorm, Rgba16Snorm, Rgba16Uint, Rgba16Sint,
            Rgba16Float, Bgra10Xr, Bgra10XrSrgb, Rgba32Uint, Rgba32Sint, Rgba32Float,
            Depth16Unorm, Depth32Float, Stencil8, Depth32FloatStencil8, Bc1Rgba, Bc3Rgba,
            Bc7RgbaUnorm, Astc4x4Ldr, Etc2Rgb8, Gbgr422, Bgrg422,
        ]
    };

    /// Bits occupied by one pixel.
    ///
    /// Returns `None` for block-compressed, subsampled and
    /// depth-plus-stencil formats, which have no per-pixel size.
    pub const fn bits_per_pixel(&self) -> Option<usize> {
        use GpuPixelFormat::*;
        match self {
            A8Unorm | R8Unorm | R8UnormSrgb | R8Snorm | R8Uint | R8Sint | Stencil8 => Some(8),

            R16Unorm | R16Snorm | R16Uint | R16Sint | R16Float | Rg8Unorm | Rg8UnormSrgb
            | Rg8Snorm | Rg8Uint | Rg8Sint | B5g6r5Unorm | A1bgr5Unorm | Abgr4Unorm
            | Bgr5a1Unorm | Depth16Unorm => Some(16),

            R32Uint | R32Sint | R32Float | Rg16Unorm | Rg16Snorm | Rg16Uint | Rg16Sint
            | Rg16Float | Rgba8Unorm | Rgba8UnormSrgb | Rgba8Snorm | Rgba8Uint | Rgba8Sint
            | Bgra8Unorm | Bgra8UnormSrgb | Rgb10a2Unorm | Rgb10a2Uint | Rg11b10Float
            | Rgb9e5Float | Bgr10a2Unorm | Bgr10Xr | Bgr10XrSrgb | Depth32Float => Some(32),

            Rg32Uint | Rg32Sint | Rg32Float | Rgba16Unorm | Rgba16Snorm | Rgba16Uint
            | Rgba16Sint | Rgba16Float | Bgra10Xr | Bgra10XrSrgb => Some(64),

            Rgba32Uint | Rgba32Sint | Rgba32Float => Some(128),

            Depth32FloatStencil8 | Bc1Rgba | Bc3Rgba | Bc7RgbaUnorm | Astc4x4Ldr | Etc2Rgb8
            | Gbgr422 | Bgrg422 => None,
        }
    }

    /// Bytes occupied by one pixel.
    #[inline]
    pub const fn bytes_per_pixel(&self) -> Option<usize> {
        match self.bits_per_pixel() {
            Some(bits) => Some(bits / 8),
            None => None,
        }
    }

    /// Number of components per pixel.
    pub const fn component_count(&self) -> Option<usize> {
        use GpuPixelFormat::*;
        match self {
            A8Unorm | R8Unorm | R8UnormSrgb | R8Snorm | R8Uint | R8Sint | R16Unorm | R16Snorm
            | R16Uint | R16Sint | R16Float | R32Uint | R32Sint | R32Float | Depth16Unorm
            | Stencil8 | Depth32Float => Some(1),

            Rg8Unorm | Rg8UnormSrgb | Rg8Snorm | Rg8Uint | Rg8Sint | Rg16Unorm | Rg16Snorm
            | Rg16Uint | Rg16Sint | Rg16Float | Rg32Uint | Rg32Sint | Rg32Float
            | Depth32FloatStencil8 => Some(2),

            B5g6r5Unorm | Rg11b10Float | Rgb9e5Float | Bgr10Xr | Bgr10XrSrgb => Some(3),

            A1bgr5Unorm | Abgr4Unorm | Bgr5a1Unorm | Rgba8Unorm | Rgba8UnormSrgb | Rgba8Snorm
            | Rgba8Uint | Rgba8Sint | Bgra8Unorm | Bgra8UnormSrgb | Rgb10a2Unorm | Rgb10a2Uint
            | Bgr10a2Unorm | Rgba16Unorm | Rgba16Snorm | Rgba16Uint | Rgba16Sint | Rgba16Float
            | Bgra10Xr | Bgra10XrSrgb | Rgba32Uint | Rgba32Sint | Rgba32Float => Some(4),

            Bc1Rgba | Bc3Rgba | Bc7RgbaUnorm | Astc4x4Ldr | Etc2Rgb8 | Gbgr422 | Bgrg422 => None,
        }
    }

    /// Bits per component: `bytes_per_pixel * 8 / component_count`.
    ///
    /// Packed formats round down (`b5g6r5Unorm` reports 5).
    #[inline]
    pub const fn bits_per_component(&self) -> Option<usize> {
        match (self.bits_per_pixel(), self.component_count()) {
            (Some(bits), Some(count)) => Some(bits / count),
            _ => None,
        }
    }

    /// Video format with the identical memory layout.
    ///
    /// sRGB variants return `None`; see [`compatible_video_format`](Self::compatible_video_format).
    pub const fn to_video_format(&self) -> Option<VideoPixelFormat> {
        use GpuPixelFormat::*;
        match self {
            R8Unorm => Some(VideoPixelFormat::OneComponent8),
            R16Unorm => Some(VideoPixelFormat::OneComponent16),
            R16Float => Some(VideoPixelFormat::OneComponent16Half),
            R32Float => Some(VideoPixelFormat::OneComponent32Float),
            Rg8Unorm => Some(VideoPixelFormat::TwoComponent8),
            Rg16Float => Some(VideoPixelFormat::TwoComponent16Half),
            Rg32Float => Some(VideoPixelFormat::TwoComponent32Float),
            Bgra8Unorm => Some(VideoPixelFormat::Bgra32),
            Rgba8Unorm => Some(VideoPixelFormat::Rgba32),
            Rgba16Float => Some(VideoPixelFormat::RgbaHalf64),
            Rgba32Float => Some(VideoPixelFormat::RgbaFloat128),
            Depth32Float => Some(VideoPixelFormat::DepthFloat32),
            _ => None,
        }
    }

    /// Video format a buffer of this GPU format can be wrapped as.
    ///
    /// Same as [`to_video_format`](Self::to_video_format) after dropping the
    /// sRGB encoding.
    #[inline]
    pub const fn compatible_video_format(&self) -> Option<VideoPixelFormat> {
        self.linear_variant().to_video_format()
    }

    /// Whether texels are sRGB-encoded.
    #[inline]
    pub const fn is_srgb(&self) -> bool {
        use GpuPixelFormat::*;
        matches!(
            self,
            R8UnormSrgb | Rg8UnormSrgb | Rgba8UnormSrgb | Bgra8UnormSrgb | Bgr10XrSrgb | Bgra10XrSrgb
        )
    }

    /// The same layout without sRGB encoding.
    pub const fn linear_variant(&self) -> GpuPixelFormat {
        use GpuPixelFormat::*;
        match self {
            R8UnormSrgb => R8Unorm,
            Rg8UnormSrgb => Rg8Unorm,
            Rgba8UnormSrgb => Rgba8Unorm,
            Bgra8UnormSrgb => Bgra8Unorm,
            Bgr10XrSrgb => Bgr10Xr,
            Bgra10XrSrgb => Bgra10Xr,
            other => *other,
        }
    }

    /// Whether this is a depth and/or stencil format.
    #[inline]
    pub const fn is_depth_or_stencil(&self) -> bool {
        use GpuPixelFormat::*;
        matches!(self, Depth16Unorm | Depth32Float | Stencil8 | Depth32FloatStencil8)
    }

    /// Whether this format stores blocks rather than pixels.
    #[inline]
    pub const fn is_compressed(&self) -> bool {
        use GpuPixelFormat::*;
        matches!(
            self,
            Bc1Rgba | Bc3Rgba | Bc7RgbaUnorm | Astc4x4Ldr | Etc2Rgb8 | Gbgr422 | Bgrg422
        )
    }

    /// Bitmap layout a CPU drawing surface uses for this format.
    ///
    /// Only gray, gray plus alpha and four-component formats the drawing
    /// surface can rasterize into have one. Two-component formats hold gray
    /// followed by premultiplied alpha.
    pub const fn bitmap_info(&self) -> Option<BitmapInfo> {
        use GpuPixelFormat::*;
        let info = match self {
            R8Unorm | R8UnormSrgb => BitmapInfo::new(AlphaInfo::None, ByteOrder::Default, false),
            R16Unorm => BitmapInfo::new(AlphaInfo::None, ByteOrder::Little16, false),
            R16Float => BitmapInfo::new(AlphaInfo::None, ByteOrder::Little16, true),
            R32Float => BitmapInfo::new(AlphaInfo::None, ByteOrder::Little32, true),
            Rg8Unorm | Rg8UnormSrgb => BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Default, false),
            Rg16Float => BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Little16, true),
            Rg32Float => BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Little32, true),
            Rgba8Unorm | Rgba8UnormSrgb => {
                BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Default, false)
            }
            Bgra8Unorm | Bgra8UnormSrgb => {
                BitmapInfo::new(AlphaInfo::PremultipliedFirst, ByteOrder::Little32, false)
            }
            Rgba16Unorm => BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Little16, false),
            Rgba16Float => BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Little16, true),
            Rgba32Float => BitmapInfo::new(AlphaInfo::PremultipliedLast, ByteOrder::Little32, true),
            _ => return None,
        };
        Some(info)
    }

    /// Color space a drawing surface over this format defaults to.
    pub const fn default_color_space(&self) -> Option<ColorSpace> {
        use GpuPixelFormat::*;
        match self {
            R8Unorm | R8UnormSrgb | Rg8Unorm | Rg8UnormSrgb => Some(ColorSpace::Gray),
            R16Unorm => Some(ColorSpace::LinearGray),
            R16Float | R32Float | Rg16Float | Rg32Float => Some(ColorSpace::ExtendedLinearGray),
            Rgba8Unorm | Rgba8UnormSrgb | Bgra8Unorm | Bgra8UnormSrgb => Some(ColorSpace::Srgb),
            Rgba16Unorm => Some(ColorSpace::LinearSrgb),
            Rgba16Float | Rgba32Float => Some(ColorSpace::ExtendedLinearSrgb),
            _ => None,
        }
    }

    /// GPU API name of the format.
    pub const fn name(&self) -> &'static str {
        use GpuPixelFormat::*;
        match self {
            A8Unorm => "a8Unorm",
            R8Unorm => "r8Unorm",
            R8UnormSrgb => "r8Unorm_srgb",
            R8Snorm => "r8Snorm",
            R8Uint => "r8Uint",
            R8Sint => "r8Sint",
            R16Unorm => "r16Unorm",
            R16Snorm => "r16Snorm",
            R16Uint => "r16Uint",
            R16Sint => "r16Sint",
            R16Float => "r16Float",
            Rg8Unorm => "rg8Unorm",
            Rg8UnormSrgb => "rg8Unorm_srgb",
            Rg8Snorm => "rg8Snorm",
            Rg8Uint => "rg8Uint",
            Rg8Sint => "rg8Sint",
            B5g6r5Unorm => "b5g6r5Unorm",
            A1bgr5Unorm => "a1bgr5Unorm",
            Abgr4Unorm => "abgr4Unorm",
            Bgr5a1Unorm => "bgr5A1Unorm",
            R32Uint => "r32Uint",
            R32Sint => "r32Sint",
            R32Float => "r32Float",
            Rg16Unorm => "rg16Unorm",
            Rg16Snorm => "rg16Snorm",
            Rg16Uint => "rg16Uint",
            Rg16Sint => "rg16Sint",
            Rg16Float => "rg16Float",
            Rgba8Unorm => "rgba8Unorm",
            Rgba8UnormSrgb => "rgba8Unorm_srgb",
            Rgba8Snorm => "rgba8Snorm",
            Rgba8Uint => "rgba8Uint",
            Rgba8Sint => "rgba8Sint",
            Bgra8Unorm => "bgra8Unorm",
            Bgra8UnormSrgb => "bgra8Unorm_srgb",
            Rgb10a2Unorm => "rgb10a2Unorm",
            Rgb10a2Uint => "rgb10a2Uint",
            Rg11b10Float => "rg11b10Float",
            Rgb9e5Float => "rgb9e5Float",
            Bgr10a2Unorm => "bgr10a2Unorm",
            Bgr10Xr => "bgr10_xr",
            Bgr10XrSrgb => "bgr10_xr_srgb",
            Rg32Uint => "rg32Uint",
            Rg32Sint => "rg32Sint",
            Rg32Float => "rg32Float",
            Rgba16Unorm => "rgba16Unorm",
            Rgba16Snorm => "rgba16Snorm",
            Rgba16Uint => "rgba16Uint",
            Rgba16Sint => "rgba16Sint",
            Rgba16Float => "rgba16Float",
            Bgra10Xr => "bgra10_xr",
            Bgra10XrSrgb => "bgra10_xr_srgb",
            Rgba32Uint => "rgba32Uint",
            Rgba32Sint => "rgba32Sint",
            Rgba32Float => "rgba32Float",
            Depth16Unorm => "depth16Unorm",
            Depth32Float => "depth32Float",
            Stencil8 => "stencil8",
            Depth32FloatStencil8 => "depth32Float_stencil8",
            Bc1Rgba => "bc1_rgba",
            Bc3Rgba => "bc3_rgba",
            Bc7RgbaUnorm => "bc7_rgbaUnorm",
            Astc4x4Ldr => "astc_4x4_ldr",
            Etc2Rgb8 => "etc2_rgb8",
            Gbgr422 => "gbgr422",
            Bgrg422 => "bgrg422",
        }
    }
}

impl fmt::Display for GpuPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GpuPixelFormat {
    type Err = Error;

    /// Parses a GPU API name, ignoring ASCII case and `_`.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_name(s);
        Self::ALL
            .iter()
            .copied()
            .find(|format| normalize_name(format.name()) == wanted)
            .ok_or_else(|| Error::unsupported_format(s))
    }
}

fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Builds a FourCC code from four ASCII bytes.
const fn fourcc(code: &[u8; 4]) -> u32 {
    ((code[0] as u32) << 24) | ((code[1] as u32) << 16) | ((code[2] as u32) << 8) | code[3] as u32
}

/// Platform video pixel format.
///
/// Each variant is identified by the FourCC (or small integer) code the
/// video API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VideoPixelFormat {
    /// No known format.
    #[default]
    Unknown,
    /// 8-bit single component (`L008`).
    OneComponent8,
    /// 16-bit unsigned single component (`L016`).
    OneComponent16,
    /// 16-bit float single component (`L00h`).
    OneComponent16Half,
    /// 32-bit float single component (`L00f`).
    OneComponent32Float,
    /// 8-bit two component (`2C08`).
    TwoComponent8,
    /// 16-bit float two component (`2C0h`).
    TwoComponent16Half,
    /// 32-bit float two component (`2C0f`).
    TwoComponent32Float,
    /// 8-bit BGRA (`BGRA`).
    Bgra32,
    /// 8-bit RGBA (`RGBA`).
    Rgba32,
    /// 8-bit ARGB (`0x20`).
    Argb32,
    /// 8-bit packed RGB (`0x18`).
    Rgb24,
    /// 16-bit float RGBA (`RGhA`).
    RgbaHalf64,
    /// 32-bit float RGBA (`RGfA`).
    RgbaFloat128,
    /// 32-bit float depth (`fdep`).
    DepthFloat32,
    /// Bi-planar 4:2:0 Y'CbCr, full range (`420f`).
    YCbCr420BiPlanarFullRange,
    /// Bi-planar 4:2:0 Y'CbCr, video range (`420v`).
    YCbCr420BiPlanarVideoRange,
}

impl VideoPixelFormat {
    /// Every video pixel format except [`Unknown`](Self::Unknown).
    pub const ALL: [VideoPixelFormat; 16] = {
        use VideoPixelFormat::*;
        [
            OneComponent8, OneComponent16, OneComponent16Half, OneComponent32Float,
            TwoComponent8, TwoComponent16Half, TwoComponent32Float, Bgra32, Rgba32, Argb32,
            Rgb24, RgbaHalf64, RgbaFloat128, DepthFloat32, YCbCr420BiPlanarFullRange,
            YCbCr420BiPlanarVideoRange,
        ]
    };

    /// FourCC code identifying the format.
    pub const fn fourcc(&self) -> u32 {
        use VideoPixelFormat::*;
        match self {
            Unknown => 0,
            OneComponent8 => fourcc(b"L008"),
            OneComponent16 => fourcc(b"L016"),
            OneComponent16Half => fourcc(b"L00h"),
            OneComponent32Float => fourcc(b"L00f"),
            TwoComponent8 => fourcc(b"2C08"),
            TwoComponent16Half => fourcc(b"2C0h"),
            TwoComponent32Float => fourcc(b"2C0f"),
            Bgra32 => fourcc(b"BGRA"),
            Rgba32 => fourcc(b"RGBA"),
            Argb32 => 0x20,
            Rgb24 => 0x18,
            RgbaHalf64 => fourcc(b"RGhA"),
            RgbaFloat128 => fourcc(b"RGfA"),
            DepthFloat32 => fourcc(b"fdep"),
            YCbCr420BiPlanarFullRange => fourcc(b"420f"),
            YCbCr420BiPlanarVideoRange => fourcc(b"420v"),
        }
    }

    /// Looks up a format by its code; unmapped codes give [`Unknown`](Self::Unknown).
    pub fn from_fourcc(code: u32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.fourcc() == code)
            .unwrap_or(Self::Unknown)
    }

    /// GPU format with the identical memory layout.
    pub const fn to_gpu_format(&self) -> Option<GpuPixelFormat> {
        use VideoPixelFormat::*;
        match self {
            OneComponent8 => Some(GpuPixelFormat::R8Unorm),
            OneComponent16 => Some(GpuPixelFormat::R16Unorm),
            OneComponent16Half => Some(GpuPixelFormat::R16Float),
            OneComponent32Float => Some(GpuPixelFormat::R32Float),
            TwoComponent8 => Some(GpuPixelFormat::Rg8Unorm),
            TwoComponent16Half => Some(GpuPixelFormat::Rg16Float),
            TwoComponent32Float => Some(GpuPixelFormat::Rg32Float),
            Bgra32 => Some(GpuPixelFormat::Bgra8Unorm),
            Rgba32 => Some(GpuPixelFormat::Rgba8Unorm),
            RgbaHalf64 => Some(GpuPixelFormat::Rgba16Float),
            RgbaFloat128 => Some(GpuPixelFormat::Rgba32Float),
            DepthFloat32 => Some(GpuPixelFormat::Depth32Float),
            Unknown | Argb32 | Rgb24 | YCbCr420BiPlanarFullRange | YCbCr420BiPlanarVideoRange => {
                None
            }
        }
    }

    /// Bytes per pixel of a packed (single plane) format.
    pub const fn bytes_per_pixel(&self) -> Option<usize> {
        use VideoPixelFormat::*;
        match self {
            OneComponent8 => Some(1),
            OneComponent16 | OneComponent16Half | TwoComponent8 => Some(2),
            Rgb24 => Some(3),
            OneComponent32Float | TwoComponent16Half | Bgra32 | Rgba32 | Argb32 | DepthFloat32 => {
                Some(4)
            }
            TwoComponent32Float | RgbaHalf64 => Some(8),
            RgbaFloat128 => Some(16),
            Unknown | YCbCr420BiPlanarFullRange | YCbCr420BiPlanarVideoRange => None,
        }
    }

    /// Number of memory planes.
    pub const fn plane_count(&self) -> usize {
        use VideoPixelFormat::*;
        match self {
            Unknown => 0,
            YCbCr420BiPlanarFullRange | YCbCr420BiPlanarVideoRange => 2,
            _ => 1,
        }
    }

    /// Whether the format stores more than one plane.
    #[inline]
    pub const fn is_planar(&self) -> bool {
        self.plane_count() > 1
    }

    /// Short display name.
    pub const fn name(&self) -> &'static str {
        use VideoPixelFormat::*;
        match self {
            Unknown => "unknown",
            OneComponent8 => "OneComponent8",
            OneComponent16 => "OneComponent16",
            OneComponent16Half => "OneComponent16Half",
            OneComponent32Float => "OneComponent32Float",
            TwoComponent8 => "TwoComponent8",
            TwoComponent16Half => "TwoComponent16Half",
            TwoComponent32Float => "TwoComponent32Float",
            Bgra32 => "32BGRA",
            Rgba32 => "32RGBA",
            Argb32 => "32ARGB",
            Rgb24 => "24RGB",
            RgbaHalf64 => "64RGBAHalf",
            RgbaFloat128 => "128RGBAFloat",
            DepthFloat32 => "DepthFloat32",
            YCbCr420BiPlanarFullRange => "420YpCbCr8BiPlanarFullRange",
            YCbCr420BiPlanarVideoRange => "420YpCbCr8BiPlanarVideoRange",
        }
    }
}

impl fmt::Display for VideoPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where alpha lives in a drawing surface pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaInfo {
    /// No alpha channel.
    None,
    /// Premultiplied alpha stored after the color components.
    PremultipliedLast,
    /// Premultiplied alpha stored before the color components.
    PremultipliedFirst,
    /// Straight alpha stored after the color components.
    Last,
    /// Straight alpha stored before the color components.
    First,
}

impl AlphaInfo {
    /// Whether a component slot is reserved for alpha.
    #[inline]
    pub const fn has_alpha(&self) -> bool {
        !matches!(self, AlphaInfo::None)
    }

    /// Whether color components are stored premultiplied.
    #[inline]
    pub const fn is_premultiplied(&self) -> bool {
        matches!(self, AlphaInfo::PremultipliedLast | AlphaInfo::PremultipliedFirst)
    }

    /// Whether alpha precedes the color components.
    #[inline]
    pub const fn is_first(&self) -> bool {
        matches!(self, AlphaInfo::PremultipliedFirst | AlphaInfo::First)
    }
}

/// Byte order of a drawing surface pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Components stored in declaration order.
    Default,
    /// 16-bit little-endian components.
    Little16,
    /// 32-bit little-endian words (reverses 8-bit component order).
    Little32,
}

/// Component layout of a CPU drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapInfo {
    /// Alpha placement.
    pub alpha: AlphaInfo,
    /// Byte order.
    pub byte_order: ByteOrder,
    /// Components are IEEE floats rather than normalized integers.
    pub float_components: bool,
}

impl BitmapInfo {
    /// Creates a bitmap layout.
    #[inline]
    pub const fn new(alpha: AlphaInfo, byte_order: ByteOrder, float_components: bool) -> Self {
        Self {
            alpha,
            byte_order,
            float_components,
        }
    }
}

/// Color space a drawing surface interprets components in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Gamma-encoded gray.
    Gray,
    /// Linear gray.
    LinearGray,
    /// Linear gray allowing values outside [0, 1].
    ExtendedLinearGray,
    /// sRGB.
    Srgb,
    /// Linear sRGB primaries.
    LinearSrgb,
    /// Linear sRGB primaries allowing values outside [0, 1].
    ExtendedLinearSrgb,
    /// Display P3.
    DisplayP3,
}

impl ColorSpace {
    /// Number of color components (alpha excluded).
    #[inline]
    pub const fn component_count(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::LinearGray | ColorSpace::ExtendedLinearGray => 1,
            _ => 3,
        }
    }

    /// Whether components may leave the [0, 1] range.
    #[inline]
    pub const fn is_extended(&self) -> bool {
        matches!(self, ColorSpace::ExtendedLinearGray | ColorSpace::ExtendedLinearSrgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(GpuPixelFormat::R8Unorm.bytes_per_pixel(), Some(1));
        assert_eq!(GpuPixelFormat::R16Float.bytes_per_pixel(), Some(2));
        assert_eq!(GpuPixelFormat::Bgra8Unorm.bytes_per_pixel(), Some(4));
        assert_eq!(GpuPixelFormat::Rgba16Float.bytes_per_pixel(), Some(8));
        assert_eq!(GpuPixelFormat::Rgba32Float.bytes_per_pixel(), Some(16));
        assert_eq!(GpuPixelFormat::Bc1Rgba.bytes_per_pixel(), None);
    }

    #[test]
    fn test_bits_per_component() {
        assert_eq!(GpuPixelFormat::R16Float.bits_per_component(), Some(16));
        assert_eq!(GpuPixelFormat::Rgba8Unorm.bits_per_component(), Some(8));
        assert_eq!(GpuPixelFormat::Rg32Float.bits_per_component(), Some(32));
        assert_eq!(GpuPixelFormat::B5g6r5Unorm.bits_per_component(), Some(5));
        // Component count known, size unknown.
        assert_eq!(GpuPixelFormat::Depth32FloatStencil8.component_count(), Some(2));
        assert_eq!(GpuPixelFormat::Depth32FloatStencil8.bits_per_component(), None);
        assert_eq!(GpuPixelFormat::Astc4x4Ldr.bits_per_component(), None);
    }

    #[test]
    fn test_video_round_trip() {
        for format in GpuPixelFormat::ALL {
            if let Some(video) = format.to_video_format() {
                assert_eq!(video.to_gpu_format(), Some(format), "{format}");
            }
        }
    }

    #[test]
    fn test_gpu_round_trip() {
        for video in VideoPixelFormat::ALL {
            if let Some(gpu) = video.to_gpu_format() {
                assert_eq!(gpu.to_video_format(), Some(video), "{video}");
            }
        }
    }

    #[test]
    fn test_srgb_uses_linear_variant() {
        assert_eq!(GpuPixelFormat::Bgra8UnormSrgb.to_video_format(), None);
        assert_eq!(
            GpuPixelFormat::Bgra8UnormSrgb.compatible_video_format(),
            Some(VideoPixelFormat::Bgra32)
        );
        assert_eq!(GpuPixelFormat::R8UnormSrgb.linear_variant(), GpuPixelFormat::R8Unorm);
        assert!(GpuPixelFormat::R8UnormSrgb.is_srgb());
        assert!(!GpuPixelFormat::R8Unorm.is_srgb());
    }

    #[test]
    fn test_unmapped_video_formats() {
        assert_eq!(VideoPixelFormat::Unknown.to_gpu_format(), None);
        assert_eq!(VideoPixelFormat::YCbCr420BiPlanarFullRange.to_gpu_format(), None);
        assert_eq!(VideoPixelFormat::YCbCr420BiPlanarFullRange.plane_count(), 2);
        assert_eq!(GpuPixelFormat::Rgb10a2Unorm.to_video_format(), None);
    }

    #[test]
    fn test_fourcc() {
        assert_eq!(VideoPixelFormat::Bgra32.fourcc(), 0x4247_5241);
        assert_eq!(VideoPixelFormat::from_fourcc(0x4247_5241), VideoPixelFormat::Bgra32);
        assert_eq!(VideoPixelFormat::from_fourcc(0x20), VideoPixelFormat::Argb32);
        assert_eq!(VideoPixelFormat::from_fourcc(0xdead_beef), VideoPixelFormat::Unknown);
    }

    #[test]
    fn test_parse_name() {
        assert_eq!("r8Unorm".parse::<GpuPixelFormat>().unwrap(), GpuPixelFormat::R8Unorm);
        assert_eq!("RGBA16FLOAT".parse::<GpuPixelFormat>().unwrap(), GpuPixelFormat::Rgba16Float);
        assert_eq!(
            "bgra8unorm-srgb".parse::<GpuPixelFormat>().unwrap(),
            GpuPixelFormat::Bgra8UnormSrgb
        );
        assert!("r7Unorm".parse::<GpuPixelFormat>().is_err());
    }

    #[test]
    fn test_bitmap_info_matches_components() {
        for format in GpuPixelFormat::ALL {
            let (Some(info), Some(space)) = (format.bitmap_info(), format.default_color_space())
            else {
                continue;
            };
            let slots = space.component_count() + usize::from(info.alpha.has_alpha());
            assert_eq!(Some(slots), format.component_count(), "{format}");
        }
        assert!(GpuPixelFormat::Rg8Snorm.bitmap_info().is_none());
    }

    #[test]
    fn test_two_component_formats_are_gray_alpha() {
        for format in [GpuPixelFormat::Rg8Unorm, GpuPixelFormat::Rg16Float, GpuPixelFormat::Rg32Float] {
            let info = format.bitmap_info().unwrap();
            assert_eq!(info.alpha, AlphaInfo::PremultipliedLast, "{format}");
            assert_eq!(format.default_color_space().unwrap().component_count(), 1, "{format}");
            assert!(format.compatible_video_format().is_some(), "{format}");
        }
        assert!(GpuPixelFormat::Rg8UnormSrgb.bitmap_info().is_some());
        assert!(GpuPixelFormat::Rg16Unorm.bitmap_info().is_none());
    }
}
