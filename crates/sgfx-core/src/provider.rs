//! Descriptor provider capability.
//!
//! Any resource that can describe its pixel memory as a
//! [`RectangularDataDescriptor`] implements [`DescriptorProvider`] (one
//! plane) or [`MultiplanarDescriptorProvider`] (per plane). Implementors
//! supply only the descriptor; every derived view comes from the default
//! methods, so the derivation logic lives in one place.
//!
//! # Example
//!
//! ```rust
//! use sgfx_core::prelude::*;
//!
//! let surface = DrawingSurface::new(64, 64, GpuPixelFormat::R8Unorm).unwrap();
//! let view = surface.image_buffer_view().unwrap();
//! assert_eq!(view.width(), 64);
//! ```

use crate::descriptor::{RectangularDataDescriptor, View};
use crate::format::{GpuPixelFormat, VideoPixelFormat};
use crate::interop::{GpuDevice, TextureUsage, VideoBufferFactory};
use crate::raster::ImageBuffer;
use crate::tensor::{TensorDataType, TensorView};
use crate::Result;

/// A resource with one addressable plane of pixel memory.
pub trait DescriptorProvider {
    /// Describes the resource's memory.
    ///
    /// Fails with [`Error::MissingData`](crate::Error::MissingData) when the
    /// resource has no addressable memory.
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>>;

    /// See [`RectangularDataDescriptor::image_buffer_view`].
    fn image_buffer_view(&self) -> Result<View<'_, ImageBuffer>> {
        Ok(self.descriptor()?.image_buffer_view())
    }

    /// See [`RectangularDataDescriptor::video_buffer_view`].
    fn video_buffer_view<F: VideoBufferFactory>(
        &self,
        factory: &F,
        format: VideoPixelFormat,
    ) -> Result<View<'_, F::VideoBuffer>> {
        self.descriptor()?.video_buffer_view(factory, format)
    }

    /// See [`RectangularDataDescriptor::tensor_view`].
    fn tensor_view(&self, shape: &[usize], data_type: TensorDataType) -> Result<TensorView<'_>> {
        Ok(self.descriptor()?.tensor_view(shape, data_type))
    }

    /// See [`RectangularDataDescriptor::tensor_view_with_strides`].
    fn tensor_view_with_strides(
        &self,
        shape: &[usize],
        strides: &[usize],
        data_type: TensorDataType,
    ) -> Result<TensorView<'_>> {
        self.descriptor()?.tensor_view_with_strides(shape, strides, data_type)
    }

    /// See [`RectangularDataDescriptor::gpu_buffer_view`].
    fn gpu_buffer_view<D: GpuDevice>(&self, device: &D) -> Result<View<'_, D::Buffer>> {
        self.descriptor()?.gpu_buffer_view(device)
    }

    /// See [`RectangularDataDescriptor::gpu_texture_view`].
    fn gpu_texture_view<D: GpuDevice>(
        &self,
        device: &D,
        format: GpuPixelFormat,
        usage: TextureUsage,
    ) -> Result<View<'_, D::Texture>> {
        self.descriptor()?.gpu_texture_view(device, format, usage)
    }
}

/// A resource whose pixel memory is split across planes.
pub trait MultiplanarDescriptorProvider {
    /// Number of planes.
    fn plane_count(&self) -> usize;

    /// Describes plane `plane`.
    ///
    /// Fails with [`Error::MissingDataOfPlane`](crate::Error::MissingDataOfPlane)
    /// when the plane is out of range or has no addressable memory.
    fn plane_descriptor(&self, plane: usize) -> Result<RectangularDataDescriptor<'_>>;

    /// Descriptors of every plane in order.
    fn plane_descriptors(&self) -> Result<Vec<RectangularDataDescriptor<'_>>> {
        (0..self.plane_count()).map(|plane| self.plane_descriptor(plane)).collect()
    }

    /// Image buffer view of one plane.
    fn plane_image_buffer_view(&self, plane: usize) -> Result<View<'_, ImageBuffer>> {
        Ok(self.plane_descriptor(plane)?.image_buffer_view())
    }

    /// Video buffer view of one plane.
    fn plane_video_buffer_view<F: VideoBufferFactory>(
        &self,
        plane: usize,
        factory: &F,
        format: VideoPixelFormat,
    ) -> Result<View<'_, F::VideoBuffer>> {
        self.plane_descriptor(plane)?.video_buffer_view(factory, format)
    }

    /// Row-major tensor view of one plane.
    fn plane_tensor_view(
        &self,
        plane: usize,
        shape: &[usize],
        data_type: TensorDataType,
    ) -> Result<TensorView<'_>> {
        Ok(self.plane_descriptor(plane)?.tensor_view(shape, data_type))
    }

    /// Strided tensor view of one plane.
    fn plane_tensor_view_with_strides(
        &self,
        plane: usize,
        shape: &[usize],
        strides: &[usize],
        data_type: TensorDataType,
    ) -> Result<TensorView<'_>> {
        self.plane_descriptor(plane)?
            .tensor_view_with_strides(shape, strides, data_type)
    }

    /// GPU buffer view of one plane.
    fn plane_gpu_buffer_view<D: GpuDevice>(&self, plane: usize, device: &D) -> Result<View<'_, D::Buffer>> {
        self.plane_descriptor(plane)?.gpu_buffer_view(device)
    }

    /// GPU texture view of one plane.
    fn plane_gpu_texture_view<D: GpuDevice>(
        &self,
        plane: usize,
        device: &D,
        format: GpuPixelFormat,
        usage: TextureUsage,
    ) -> Result<View<'_, D::Texture>> {
        self.plane_descriptor(plane)?.gpu_texture_view(device, format, usage)
    }
}
