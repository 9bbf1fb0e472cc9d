//! Error types for sgfx operations.
//!
//! This module provides a single error type shared by every crate in the
//! workspace: format lookups, descriptor derivations, provider queries and
//! shared buffer construction all fail with [`Error`].
//!
//! # Overview
//!
//! The [`Error`] enum covers all failure modes that can occur during:
//! - Pixel format resolution
//! - Raw page allocation
//! - No-copy wrapping by a collaborator (GPU buffer, texture, video buffer,
//!   drawing surface)
//! - Descriptor production by a provider
//! - Tensor bounds checking
//!
//! # Usage
//!
//! ```rust
//! use sgfx_core::{Error, Result};
//!
//! fn check_tensor(required: usize, available: usize) -> Result<()> {
//!     if required > available {
//!         return Err(Error::out_of_bounds(required, available));
//!     }
//!     Ok(())
//! }
//! assert!(check_tensor(16385, 16384).is_err());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use thiserror::Error;

use crate::format::{GpuPixelFormat, VideoPixelFormat};
use crate::interop::StorageMode;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or deriving shared memory views.
///
/// # Categories
///
/// - **Format errors**: [`UnsupportedPixelFormat`](Error::UnsupportedPixelFormat),
///   [`UnsupportedStorageMode`](Error::UnsupportedStorageMode)
/// - **Allocation errors**: [`AllocationFailed`](Error::AllocationFailed)
/// - **Wrap errors**: [`BufferCreationFailed`](Error::BufferCreationFailed),
///   [`TextureCreationFailed`](Error::TextureCreationFailed),
///   [`VideoBufferCreationFailed`](Error::VideoBufferCreationFailed),
///   [`DrawingSurfaceCreationFailed`](Error::DrawingSurfaceCreationFailed)
/// - **Provider errors**: [`MissingData`](Error::MissingData),
///   [`MissingDataOfPlane`](Error::MissingDataOfPlane)
/// - **Bounds errors**: [`OutOfBounds`](Error::OutOfBounds),
///   [`BufferSizeNotPageAligned`](Error::BufferSizeNotPageAligned),
///   [`InvalidDimensions`](Error::InvalidDimensions),
///   [`InvalidTensorShape`](Error::InvalidTensorShape)
#[derive(Debug, Error)]
pub enum Error {
    /// The format has no mapping or lacks a fact needed for the operation.
    #[error("unsupported pixel format: {format}")]
    UnsupportedPixelFormat {
        /// Format name
        format: String,
    },

    /// Storage mode cannot alias CPU memory.
    #[error("storage mode {mode:?} cannot alias CPU memory")]
    UnsupportedStorageMode {
        /// Requested storage mode
        mode: StorageMode,
    },

    /// Raw page allocation failed.
    ///
    /// The caller may retry with smaller dimensions.
    #[error("failed to allocate {requested} bytes: {reason}")]
    AllocationFailed {
        /// Bytes requested
        requested: usize,
        /// Failure reason
        reason: String,
    },

    /// The GPU collaborator rejected a no-copy buffer wrap.
    #[error("GPU buffer creation failed for {length} bytes: {reason}")]
    BufferCreationFailed {
        /// Wrapped length in bytes
        length: usize,
        /// Failure reason
        reason: String,
    },

    /// The GPU collaborator rejected a texture-from-buffer request.
    #[error("texture creation failed ({format}, {bytes_per_row} bytes/row, offset {offset}): {reason}")]
    TextureCreationFailed {
        /// Texture pixel format
        format: GpuPixelFormat,
        /// Row stride passed to the device
        bytes_per_row: usize,
        /// Byte offset into the buffer
        offset: usize,
        /// Failure reason
        reason: String,
    },

    /// The video collaborator rejected a no-copy pixel buffer wrap.
    #[error("video buffer creation failed ({format}, {bytes_per_row} bytes/row): {reason}")]
    VideoBufferCreationFailed {
        /// Video pixel format
        format: VideoPixelFormat,
        /// Row stride passed to the factory
        bytes_per_row: usize,
        /// Failure reason
        reason: String,
    },

    /// A CPU drawing surface could not be built over the memory.
    #[error("drawing surface creation failed ({format}, {bytes_per_row} bytes/row): {reason}")]
    DrawingSurfaceCreationFailed {
        /// Source pixel format
        format: GpuPixelFormat,
        /// Row stride
        bytes_per_row: usize,
        /// Failure reason
        reason: String,
    },

    /// The provider has no addressable memory.
    #[error("resource has no addressable data")]
    MissingData,

    /// The plane is out of range or has no addressable memory.
    #[error("resource has no addressable data for plane {0}")]
    MissingDataOfPlane(usize),

    /// A tensor view would address more bytes than the source holds.
    #[error("tensor requires {required} bytes but only {available} are addressable")]
    OutOfBounds {
        /// Bytes the view would address
        required: usize,
        /// Bytes the descriptor covers
        available: usize,
    },

    /// No-copy GPU buffers must span whole 4096-byte pages.
    #[error("buffer size {length} is not a multiple of 4096 bytes")]
    BufferSizeNotPageAligned {
        /// Offending length
        length: usize,
    },

    /// Zero or overflowing dimensions.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Shape and strides disagree.
    #[error("invalid tensor shape: {0}")]
    InvalidTensorShape(String),
}

impl Error {
    /// Creates an [`Error::UnsupportedPixelFormat`] error.
    #[inline]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedPixelFormat {
            format: format.into(),
        }
    }

    /// Creates an [`Error::AllocationFailed`] error.
    #[inline]
    pub fn allocation_failed(requested: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::BufferCreationFailed`] error.
    #[inline]
    pub fn buffer_creation_failed(length: usize, reason: impl Into<String>) -> Self {
        Self::BufferCreationFailed {
            length,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::TextureCreationFailed`] error.
    #[inline]
    pub fn texture_creation_failed(
        format: GpuPixelFormat,
        bytes_per_row: usize,
        offset: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::TextureCreationFailed {
            format,
            bytes_per_row,
            offset,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::VideoBufferCreationFailed`] error.
    #[inline]
    pub fn video_buffer_creation_failed(
        format: VideoPixelFormat,
        bytes_per_row: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::VideoBufferCreationFailed {
            format,
            bytes_per_row,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::DrawingSurfaceCreationFailed`] error.
    #[inline]
    pub fn drawing_surface_creation_failed(
        format: GpuPixelFormat,
        bytes_per_row: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::DrawingSurfaceCreationFailed {
            format,
            bytes_per_row,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(required: usize, available: usize) -> Self {
        Self::OutOfBounds {
            required,
            available,
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a bounds-related error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. } | Self::BufferSizeNotPageAligned { .. }
        )
    }

    /// Returns `true` if this is an allocation error.
    #[inline]
    pub fn is_allocation_error(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Returns `true` if a collaborator rejected a no-copy wrap.
    #[inline]
    pub fn is_wrap_error(&self) -> bool {
        matches!(
            self,
            Self::BufferCreationFailed { .. }
                | Self::TextureCreationFailed { .. }
                | Self::VideoBufferCreationFailed { .. }
                | Self::DrawingSurfaceCreationFailed { .. }
        )
    }

    /// Returns `true` if a provider had no addressable memory.
    #[inline]
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData | Self::MissingDataOfPlane(_))
    }
}
