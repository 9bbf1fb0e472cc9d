//! # sgfx-shared
//!
//! Zero-copy shared graphics memory.
//!
//! One page-aligned allocation, wrapped at once as a GPU buffer, a texture,
//! an image-processing buffer, a platform video buffer and a CPU drawing
//! surface, all sharing one row stride.
//!
//! # Architecture
//!
//! ```text
//! SharedGraphicsBuffer
//!     +-- plan_layout      (row stride and allocation size from collaborator alignments)
//!     +-- PageAllocation   (RAII page-aligned memory, sole owner)
//!     +-- views            (GPU buffer, texture, image buffer, video buffer, drawing surface)
//!
//! backend (host collaborators)
//!     +-- HostDevice, HostVideoFactory, HostImageProcessing, HostSurface
//! ```
//!
//! # Example
//!
//! ```rust
//! use sgfx_core::prelude::*;
//! use sgfx_shared::{HostContext, HostSharedBuffer, SharedBufferOptions};
//!
//! let context = HostContext::host_default();
//! let mut buffer = HostSharedBuffer::new(&context, 64, 64, GpuPixelFormat::Bgra8Unorm, SharedBufferOptions::default())?;
//! buffer.drawing_surface_mut().fill(Color::WHITE);
//! assert_eq!(buffer.texture().texel(0, 0), Some(&[255u8, 255, 255, 255][..]));
//! # Ok::<(), sgfx_core::Error>(())
//! ```
//!
//! # Environment Variables
//!
//! - `SGFX_MAX_ALLOC_MB` - Largest single page allocation, in megabytes

#![warn(missing_docs)]

pub mod backend;
pub mod buffer;
pub mod layout;
pub mod memory;
pub mod page_aligned;

pub use backend::{
    HostBuffer, HostDevice, HostDeviceLimits, HostImageProcessing, HostSurface, HostTexture, HostVideoBuffer,
    HostVideoFactory,
};
pub use buffer::{HostContext, HostSharedBuffer, SharedBufferOptions, SharedContext, SharedGraphicsBuffer};
pub use layout::{plan_layout, LayoutPlan};
pub use memory::{format_bytes, page_size, PageAllocation, SystemPageAllocator};
pub use page_aligned::PageAlignedImage;
