//! Rectangular data descriptor and the views derived from it.
//!
//! A [`RectangularDataDescriptor`] is the canonical description of 2D pixel
//! memory: `(width, height, base address, bytes per row)`. It never owns the
//! memory it points at. Every consumer-side view (image-processing buffer,
//! video buffer, tensor, GPU buffer, GPU texture) is derived from it without
//! copying.
//!
//! # Lifetimes
//!
//! The descriptor borrows its source for `'a`. Views that are plain handles
//! of a collaborator (GPU buffers, textures, video buffers) come back wrapped
//! in [`View`], which carries the same lifetime so the handle cannot outlive
//! the memory it aliases.
//!
//! # Usage
//!
//! ```rust
//! use std::ptr::NonNull;
//! use sgfx_core::descriptor::RectangularDataDescriptor;
//! use sgfx_core::tensor::TensorDataType;
//!
//! let mut pixels = vec![0u8; 256 * 64];
//! let base = NonNull::new(pixels.as_mut_ptr()).unwrap();
//! // SAFETY: `pixels` outlives the descriptor and holds 256 * 64 bytes.
//! let desc = unsafe { RectangularDataDescriptor::from_raw_parts(64, 64, base, 256) };
//! assert_eq!(desc.data_length(), 16384);
//!
//! assert!(desc.tensor_view_with_strides(&[64, 64], &[64, 1], TensorDataType::Float32).is_ok());
//! assert!(desc.tensor_view_with_strides(&[65, 64], &[64, 1], TensorDataType::Float32).is_err());
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use tracing::{trace, warn};

use crate::format::{GpuPixelFormat, VideoPixelFormat};
use crate::interop::{
    GpuDevice, StorageMode, TextureDescriptor, TextureUsage, VideoBufferAttributes,
    VideoBufferFactory,
};
use crate::raster::ImageBuffer;
use crate::tensor::{row_major_strides, TensorDataType, TensorView};
use crate::{Error, Result};

/// Length granularity for wrapping memory as a GPU buffer without copying.
pub const NO_COPY_BUFFER_GRANULARITY: usize = 4096;

/// Rounds `value` up to a multiple of `align`.
///
/// `align` of zero leaves the value unchanged. Returns `None` on overflow.
#[inline]
pub const fn checked_align_up(value: usize, align: usize) -> Option<usize> {
    if align == 0 {
        return Some(value);
    }
    match value.checked_add(align - 1) {
        Some(v) => Some(v / align * align),
        None => None,
    }
}

/// A collaborator handle bound to the lifetime of the memory it aliases.
pub struct View<'a, T> {
    inner: T,
    _source: PhantomData<&'a [u8]>,
}

impl<'a, T> View<'a, T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            _source: PhantomData,
        }
    }

    /// Detaches the handle from its source lifetime.
    ///
    /// # Safety
    ///
    /// The caller must keep the aliased memory alive for as long as the
    /// returned handle is used.
    pub unsafe fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for View<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for View<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("View").field(&self.inner).finish()
    }
}

/// `(width, height, base address, bytes per row)` over memory owned elsewhere.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RectangularDataDescriptor<'a> {
    width: usize,
    height: usize,
    base_address: NonNull<u8>,
    bytes_per_row: usize,
    _source: PhantomData<&'a [u8]>,
}

impl fmt::Debug for RectangularDataDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RectangularDataDescriptor")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("base_address", &self.base_address)
            .field("bytes_per_row", &self.bytes_per_row)
            .finish()
    }
}

impl<'a> RectangularDataDescriptor<'a> {
    /// Creates a descriptor over raw memory.
    ///
    /// # Safety
    ///
    /// `base_address` must be valid for reads and writes of
    /// `bytes_per_row * height` bytes for all of `'a`, and must not be
    /// accessed through a Rust reference while views derived from this
    /// descriptor write to it.
    #[inline]
    pub unsafe fn from_raw_parts(
        width: usize,
        height: usize,
        base_address: NonNull<u8>,
        bytes_per_row: usize,
    ) -> Self {
        Self {
            width,
            height,
            base_address,
            bytes_per_row,
            _source: PhantomData,
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

    /// Address of the first row.
    #[inline]
    pub fn base_address(&self) -> NonNull<u8> {
        self.base_address
    }

    /// Row stride in bytes.
    #[inline]
    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    /// Addressable bytes: `bytes_per_row * height`.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.bytes_per_row * self.height
    }

    /// Whether the base address is a multiple of `page_size`.
    #[inline]
    pub fn is_page_aligned(&self, page_size: usize) -> bool {
        page_size != 0 && self.base_address.as_ptr() as usize % page_size == 0
    }

    /// The memory as a row-stride image-processing buffer.
    pub fn image_buffer_view(&self) -> View<'a, ImageBuffer> {
        // SAFETY: the descriptor guarantees `data_length` valid bytes for 'a.
        let buffer = unsafe {
            ImageBuffer::from_raw_parts(self.base_address, self.height, self.width, self.bytes_per_row)
        };
        View::new(buffer)
    }

    /// Wraps the memory as a platform video buffer of `format`.
    ///
    /// Fails with [`Error::MissingData`] if the factory cannot wrap it.
    pub fn video_buffer_view<F: VideoBufferFactory>(
        &self,
        factory: &F,
        format: VideoPixelFormat,
    ) -> Result<View<'a, F::VideoBuffer>> {
        // SAFETY: the returned view cannot outlive 'a.
        let wrapped = unsafe {
            factory.create_no_copy(
                self.width,
                self.height,
                format,
                self.base_address,
                self.bytes_per_row,
                &VideoBufferAttributes::default(),
            )
        };
        match wrapped {
            Ok(buffer) => Ok(View::new(buffer)),
            Err(err) => {
                warn!(%format, bytes_per_row = self.bytes_per_row, "video buffer view rejected: {}", err);
                Err(Error::MissingData)
            }
        }
    }

    /// Tensor over the memory with row-major strides (last dimension contiguous).
    ///
    /// The shape is trusted; element reads are still bounds-checked.
    pub fn tensor_view(&self, shape: &[usize], data_type: TensorDataType) -> TensorView<'a> {
        let strides = row_major_strides(shape);
        // SAFETY: the descriptor guarantees `data_length` valid bytes for 'a.
        unsafe {
            TensorView::from_raw_parts(
                self.base_address,
                shape.to_vec(),
                strides,
                data_type,
                self.data_length(),
            )
        }
    }

    /// Tensor over the memory with explicit element strides.
    ///
    /// Fails with [`Error::OutOfBounds`] when
    /// `product(shape) * data_type.stride()` exceeds [`data_length`](Self::data_length).
    pub fn tensor_view_with_strides(
        &self,
        shape: &[usize],
        strides: &[usize],
        data_type: TensorDataType,
    ) -> Result<TensorView<'a>> {
        if shape.len() != strides.len() {
            return Err(Error::InvalidTensorShape(format!(
                "{} dimensions but {} strides",
                shape.len(),
                strides.len()
            )));
        }
        let available = self.data_length();
        let required = shape
            .iter()
            .try_fold(data_type.stride(), |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| Error::out_of_bounds(usize::MAX, available))?;
        if required > available {
            return Err(Error::out_of_bounds(required, available));
        }
        trace!(?shape, ?strides, required, available, "tensor view");
        // SAFETY: the descriptor guarantees `data_length` valid bytes for 'a.
        Ok(unsafe {
            TensorView::from_raw_parts(
                self.base_address,
                shape.to_vec(),
                strides.to_vec(),
                data_type,
                available,
            )
        })
    }

    /// Wraps the memory as a GPU buffer without copying.
    ///
    /// The data length must be a multiple of 4096 bytes.
    pub fn gpu_buffer_view<D: GpuDevice>(&self, device: &D) -> Result<View<'a, D::Buffer>> {
        let length = self.data_length();
        if length % NO_COPY_BUFFER_GRANULARITY != 0 {
            return Err(Error::BufferSizeNotPageAligned { length });
        }
        // SAFETY: the returned view cannot outlive 'a.
        let buffer = unsafe {
            device.new_buffer_no_copy(self.base_address, length, StorageMode::Shared.resource_options())
        }
        .map_err(|err| match err {
            err @ Error::BufferCreationFailed { .. } => err,
            other => Error::buffer_creation_failed(length, other.to_string()),
        })?;
        Ok(View::new(buffer))
    }

    /// Texture over the memory, built from [`gpu_buffer_view`](Self::gpu_buffer_view)
    /// at offset 0 with this descriptor's row stride.
    pub fn gpu_texture_view<D: GpuDevice>(
        &self,
        device: &D,
        format: GpuPixelFormat,
        usage: TextureUsage,
    ) -> Result<View<'a, D::Texture>> {
        let buffer = self.gpu_buffer_view(device)?;
        let descriptor = TextureDescriptor::new_2d(format, self.width, self.height)
            .with_usage(usage)
            .with_storage_mode(StorageMode::Shared);
        let texture = device
            .new_texture_from_buffer(&buffer, &descriptor, 0, self.bytes_per_row)
            .map_err(|err| match err {
                err @ Error::TextureCreationFailed { .. } => err,
                other => Error::texture_creation_failed(format, self.bytes_per_row, 0, other.to_string()),
            })?;
        Ok(View::new(texture))
    }
}

// The descriptor is a plain address plus geometry; thread-safety of the
// memory itself is the owner's concern.
unsafe impl Send for RectangularDataDescriptor<'_> {}
unsafe impl Sync for RectangularDataDescriptor<'_> {}
