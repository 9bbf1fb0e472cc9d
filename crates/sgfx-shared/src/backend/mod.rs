//! Host collaborators.
//!
//! CPU-side implementations of every collaborator contract in
//! [`sgfx_core::interop`], so shared buffers can be built and verified
//! without a GPU or a video pipeline.
//!
//! # Architecture
//!
//! ```text
//! SharedContext<D, V, I>
//!     +-- HostDevice          (GpuDevice: no-copy buffers, linear textures)
//!     +-- HostVideoFactory    (VideoBufferFactory: no-copy and owned pixel buffers)
//!     +-- HostImageProcessing (ImageProcessing: row alignment queries)
//!
//! HostSurface  (page-aligned packed or planar surface, owns its memory)
//! ```

mod device;
mod image;
mod surface;
mod video;

pub use device::{HostBuffer, HostDevice, HostDeviceLimits, HostTexture};
pub use image::HostImageProcessing;
pub use surface::{HostSurface, PlaneLayout, SURFACE_ROW_ALIGNMENT};
pub use video::{BaseAddressLock, HostVideoBuffer, HostVideoFactory, GPU_COMPATIBLE_ALIGNMENT};
