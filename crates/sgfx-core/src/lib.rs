//! # sgfx-core
//!
//! Core types for zero-copy shared graphics memory.
//!
//! This crate provides the vocabulary every other sgfx crate speaks:
//!
//! - [`GpuPixelFormat`], [`VideoPixelFormat`] - Pixel format compatibility table
//! - [`RectangularDataDescriptor`] - `(width, height, base address, row stride)` plus derived views
//! - [`DescriptorProvider`], [`MultiplanarDescriptorProvider`] - Capability traits for pixel resources
//! - [`ImageBuffer`], [`TensorView`], [`DrawingSurface`], [`BitmapImage`] - CPU-side views
//! - [`interop`] - Traits for the GPU, video and image-processing collaborators
//!
//! ## Design Philosophy
//!
//! One block of memory, many views. A resource describes its memory once;
//! every consumer view is derived from that description without copying:
//!
//! ```text
//!                      RectangularDataDescriptor
//!                                 |
//!      +-------------+------------+------------+-------------+
//!      |             |            |            |             |
//!  ImageBuffer  VideoBuffer  TensorView    GpuBuffer ---> GpuTexture
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//! sgfx-core (this crate)
//!    ^
//!    |
//!    +-- sgfx-shared (page allocation, layout planning, SharedGraphicsBuffer, host backend)
//!    +-- sgfx-cli (sgfx binary)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bitmap;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod interop;
pub mod provider;
pub mod raster;
pub mod rect;
pub mod surface;
pub mod tensor;

// Re-exports for convenience
pub use bitmap::BitmapImage;
pub use descriptor::{checked_align_up, RectangularDataDescriptor, View, NO_COPY_BUFFER_GRANULARITY};
pub use error::*;
pub use format::*;
pub use provider::{DescriptorProvider, MultiplanarDescriptorProvider};
pub use raster::{ImageBuffer, ImageBufferLayout};
pub use rect::Rect;
pub use surface::{luminance_rec709, Color, DrawingSurface};
pub use tensor::{TensorDataType, TensorElement, TensorView};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use sgfx_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bitmap::BitmapImage;
    pub use crate::descriptor::{RectangularDataDescriptor, View};
    pub use crate::error::{Error, Result};
    pub use crate::format::{AlphaInfo, BitmapInfo, ByteOrder, ColorSpace, GpuPixelFormat, VideoPixelFormat};
    pub use crate::interop::{
        GpuBuffer, GpuDevice, ImageProcessing, PageAllocator, ResourceOptions, SizeAndAlign,
        StorageMode, TextureDescriptor, TextureUsage, VideoBufferAttributes, VideoBufferFactory,
    };
    pub use crate::provider::{DescriptorProvider, MultiplanarDescriptorProvider};
    pub use crate::raster::ImageBuffer;
    pub use crate::rect::Rect;
    pub use crate::surface::{Color, DrawingSurface};
    pub use crate::tensor::{TensorDataType, TensorView};
}
