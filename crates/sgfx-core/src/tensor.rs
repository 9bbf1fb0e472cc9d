//! Stride-based numeric tensor views.
//!
//! A [`TensorView`] reinterprets pixel memory as an N-dimensional array of
//! numbers for ML inference. Strides are counted in elements, matching the
//! convention of on-device ML array types.
//!
//! Element reads are bounds-checked against the byte length of the source
//! descriptor, so a view whose strides overreach returns `None` instead of
//! reading foreign memory.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use bytemuck::Pod;
use half::f16;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorDataType {
    /// IEEE 754 half precision.
    Float16,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
    /// Signed 32-bit integer.
    Int32,
}

impl TensorDataType {
    /// Size of one element in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            TensorDataType::Float16 => size_of::<f16>(),
            TensorDataType::Float32 => size_of::<f32>(),
            TensorDataType::Float64 => size_of::<f64>(),
            TensorDataType::Int32 => size_of::<i32>(),
        }
    }

    /// Distance between consecutive elements in bytes.
    ///
    /// Equal to [`size`](Self::size) for every supported type.
    #[inline]
    pub const fn stride(&self) -> usize {
        self.size()
    }

    /// Short name.
    pub const fn name(&self) -> &'static str {
        match self {
            TensorDataType::Float16 => "float16",
            TensorDataType::Float32 => "float32",
            TensorDataType::Float64 => "float64",
            TensorDataType::Int32 => "int32",
        }
    }
}

impl fmt::Display for TensorDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types that can be read out of a tensor.
pub trait TensorElement: Pod {
    /// Matching tensor data type.
    const DATA_TYPE: TensorDataType;
}

impl TensorElement for f16 {
    const DATA_TYPE: TensorDataType = TensorDataType::Float16;
}

impl TensorElement for f32 {
    const DATA_TYPE: TensorDataType = TensorDataType::Float32;
}

impl TensorElement for f64 {
    const DATA_TYPE: TensorDataType = TensorDataType::Float64;
}

impl TensorElement for i32 {
    const DATA_TYPE: TensorDataType = TensorDataType::Int32;
}

/// Row-major element strides for `shape`: last dimension contiguous, each
/// outer stride the product of the inner dimensions.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].saturating_mul(shape[i + 1]);
    }
    strides
}

/// N-dimensional numeric view over memory owned elsewhere.
pub struct TensorView<'a> {
    base: NonNull<u8>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    data_type: TensorDataType,
    byte_length: usize,
    _source: PhantomData<&'a [u8]>,
}

impl<'a> TensorView<'a> {
    /// Creates a view over raw memory.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads of `byte_length` bytes for all of `'a`.
    pub unsafe fn from_raw_parts(
        base: NonNull<u8>,
        shape: Vec<usize>,
        strides: Vec<usize>,
        data_type: TensorDataType,
        byte_length: usize,
    ) -> Self {
        Self {
            base,
            shape,
            strides,
            data_type,
            byte_length,
            _source: PhantomData,
        }
    }

    /// Dimensions.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element strides per dimension.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Element type.
    #[inline]
    pub fn data_type(&self) -> TensorDataType {
        self.data_type
    }

    /// Number of elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Bytes the shape covers when densely packed: `count * stride`.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.count() * self.data_type.stride()
    }

    /// Bytes addressable through this view.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Address of element zero.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.base.as_ptr()
    }

    /// Byte offset of the element at `index`, if it is inside the shape and
    /// inside the source memory.
    pub fn byte_offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut element = 0usize;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if i >= dim {
                return None;
            }
            element = element.checked_add(i.checked_mul(stride)?)?;
        }
        let offset = element.checked_mul(self.data_type.stride())?;
        let end = offset.checked_add(self.data_type.size())?;
        (end <= self.byte_length).then_some(offset)
    }

    /// Reads the element at `index`.
    ///
    /// Returns `None` if `T` does not match the data type or the index is
    /// out of range.
    pub fn get<T: TensorElement>(&self, index: &[usize]) -> Option<T> {
        if T::DATA_TYPE != self.data_type {
            return None;
        }
        let offset = self.byte_offset(index)?;
        // SAFETY: `byte_offset` checked `offset + size_of::<T>()` against the
        // source length; the read tolerates any alignment.
        Some(unsafe { self.base.as_ptr().add(offset).cast::<T>().read_unaligned() })
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("data_type", &self.data_type)
            .field("byte_length", &self.byte_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'a>(bytes: &'a [u8], shape: &[usize], strides: &[usize], data_type: TensorDataType) -> TensorView<'a> {
        let base = NonNull::from(bytes).cast::<u8>();
        unsafe { TensorView::from_raw_parts(base, shape.to_vec(), strides.to_vec(), data_type, bytes.len()) }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(TensorDataType::Float16.size(), 2);
        assert_eq!(TensorDataType::Float16.stride(), 2);
        assert_eq!(TensorDataType::Float32.size(), 4);
        assert_eq!(TensorDataType::Float64.stride(), 8);
        assert_eq!(TensorDataType::Int32.size(), 4);
    }

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), vec![1]);
        assert!(row_major_strides(&[]).is_empty());
    }

    #[test]
    fn test_get_f16() {
        let values = [f16::from_f32(0.5), f16::from_f32(1.0), f16::from_f32(2.0), f16::ZERO];
        let bytes: &[u8] = bytemuck::cast_slice(&values);
        let tensor = view(bytes, &[2, 2], &[2, 1], TensorDataType::Float16);
        assert_eq!(tensor.get::<f16>(&[1, 0]), Some(f16::from_f32(2.0)));
        assert_eq!(tensor.get::<f32>(&[1, 0]), None);
        assert_eq!(tensor.data_length(), 8);
    }

    #[test]
    fn test_overreaching_strides_are_checked() {
        let bytes = [0u8; 16];
        // Four f32 elements, but the outer stride jumps past the end.
        let tensor = view(&bytes, &[2, 2], &[8, 1], TensorDataType::Float32);
        assert_eq!(tensor.get::<f32>(&[0, 1]), Some(0.0));
        assert_eq!(tensor.get::<f32>(&[1, 0]), None);
        assert_eq!(tensor.byte_offset(&[0]), None);
    }
}
