//! Shared graphics buffer tests: aliasing, alignment, ownership, drawing round trips.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use half::f16;
use sgfx_core::interop::{
    GpuBuffer, GpuDevice, PageAllocator, ResourceOptions, SizeAndAlign, StorageMode, TextureDescriptor,
    VideoBufferAttributes, VideoBufferFactory,
};
use sgfx_core::prelude::*;
use sgfx_shared::{
    HostBuffer, HostContext, HostDevice, HostDeviceLimits, HostImageProcessing, HostSharedBuffer, HostTexture,
    HostVideoBuffer, HostVideoFactory, SharedBufferOptions, SharedContext, SharedGraphicsBuffer, SystemPageAllocator,
};

// =============================================================================
// Test doubles
// =============================================================================

/// Page allocator that counts allocations and frees, with an optional cap.
#[derive(Clone, Default)]
struct CountingAllocator {
    allocs: Arc<AtomicUsize>,
    frees: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl CountingAllocator {
    fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
}

impl PageAllocator for CountingAllocator {
    fn page_size(&self) -> usize {
        4096
    }

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if self.limit.is_some_and(|limit| layout.size() > limit) {
            return Err(Error::allocation_failed(layout.size(), "over test limit"));
        }
        let ptr = SystemPageAllocator.allocate(layout)?;
        self.allocs.fetch_add(1, Ordering::SeqCst);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        unsafe { SystemPageAllocator.deallocate(ptr, layout) }
    }
}

/// Device that wraps buffers but refuses every texture.
#[derive(Default)]
struct NoTextureDevice(HostDevice);

impl GpuDevice for NoTextureDevice {
    type Buffer = HostBuffer;
    type Texture = HostTexture;

    unsafe fn new_buffer_no_copy(&self, ptr: NonNull<u8>, length: usize, options: ResourceOptions) -> Result<HostBuffer> {
        unsafe { self.0.new_buffer_no_copy(ptr, length, options) }
    }

    fn new_texture_from_buffer(
        &self,
        _buffer: &HostBuffer,
        _descriptor: &TextureDescriptor,
        _offset: usize,
        _bytes_per_row: usize,
    ) -> Result<HostTexture> {
        Err(Error::MissingData)
    }

    fn minimum_texture_buffer_alignment(&self, format: GpuPixelFormat) -> usize {
        self.0.minimum_texture_buffer_alignment(format)
    }

    fn minimum_linear_texture_alignment(&self, format: GpuPixelFormat) -> usize {
        self.0.minimum_linear_texture_alignment(format)
    }

    fn heap_texture_size_and_align(&self, descriptor: &TextureDescriptor) -> SizeAndAlign {
        self.0.heap_texture_size_and_align(descriptor)
    }
}

/// Device that refuses to wrap any memory as a buffer.
#[derive(Default)]
struct NoBufferDevice(HostDevice);

impl GpuDevice for NoBufferDevice {
    type Buffer = HostBuffer;
    type Texture = HostTexture;

    unsafe fn new_buffer_no_copy(&self, _ptr: NonNull<u8>, _length: usize, _options: ResourceOptions) -> Result<HostBuffer> {
        Err(Error::MissingData)
    }

    fn new_texture_from_buffer(
        &self,
        buffer: &HostBuffer,
        descriptor: &TextureDescriptor,
        offset: usize,
        bytes_per_row: usize,
    ) -> Result<HostTexture> {
        self.0.new_texture_from_buffer(buffer, descriptor, offset, bytes_per_row)
    }

    fn minimum_texture_buffer_alignment(&self, format: GpuPixelFormat) -> usize {
        self.0.minimum_texture_buffer_alignment(format)
    }

    fn minimum_linear_texture_alignment(&self, format: GpuPixelFormat) -> usize {
        self.0.minimum_linear_texture_alignment(format)
    }

    fn heap_texture_size_and_align(&self, descriptor: &TextureDescriptor) -> SizeAndAlign {
        self.0.heap_texture_size_and_align(descriptor)
    }
}

/// Video factory that refuses every wrap.
#[derive(Clone, Copy, Default)]
struct NoVideoFactory;

impl VideoBufferFactory for NoVideoFactory {
    type VideoBuffer = HostVideoBuffer;

    unsafe fn create_no_copy(
        &self,
        _width: usize,
        _height: usize,
        _format: VideoPixelFormat,
        _ptr: NonNull<u8>,
        _bytes_per_row: usize,
        _attributes: &VideoBufferAttributes,
    ) -> Result<HostVideoBuffer> {
        Err(Error::MissingData)
    }
}

fn build(width: usize, height: usize, format: GpuPixelFormat) -> HostSharedBuffer {
    HostSharedBuffer::new(&HostContext::host_default(), width, height, format, SharedBufferOptions::default())
        .unwrap()
}

fn byte_sum(buffer: &ImageBuffer) -> usize {
    buffer.rows().flat_map(|row| row.iter()).map(|&b| b as usize).sum()
}

// =============================================================================
// Aliasing
// =============================================================================

#[test]
fn test_views_alias_one_allocation() {
    let buffer = build(64, 32, GpuPixelFormat::Bgra8Unorm);
    let base = buffer.descriptor().unwrap().base_address();

    assert_eq!(buffer.gpu_buffer().contents(), base);
    assert_eq!(buffer.image_buffer().data(), base);
    assert_eq!(buffer.drawing_surface().data(), base);
    assert_eq!(buffer.texture().descriptor().unwrap().base_address(), base);
    assert_eq!(buffer.video_buffer().descriptor().unwrap().base_address(), base);
}

#[test]
fn test_drawing_visible_through_every_view() {
    let mut buffer = build(64, 32, GpuPixelFormat::Bgra8Unorm);
    buffer
        .drawing_surface_mut()
        .fill_rect(Rect::new(5, 7, 1, 1), Color::rgb(1.0, 0.0, 0.0));

    let expected = [0u8, 0, 255, 255];
    let offset = 7 * buffer.bytes_per_row() + 5 * 4;

    assert_eq!(&buffer.image_buffer().row(7).unwrap()[20..24], &expected);
    assert_eq!(buffer.texture().texel(5, 7), Some(&expected[..]));
    assert_eq!(&buffer.gpu_buffer().as_slice()[offset..offset + 4], &expected);
    assert_eq!(&buffer.as_bytes()[offset..offset + 4], &expected);

    let video = buffer.video_buffer();
    let row = video.image_buffer_view().unwrap();
    assert_eq!(&row.row(7).unwrap()[20..24], &expected);
    assert_eq!(video.lock_count(), 0);
}

#[test]
fn test_image_buffer_writes_reach_the_surface() {
    let mut buffer = build(16, 16, GpuPixelFormat::R8Unorm);
    buffer.image_buffer_mut().row_mut(2).unwrap()[3] = 200;
    assert_eq!(buffer.drawing_surface().pixel(3, 2), Some(&[200u8][..]));
}

// =============================================================================
// Layout and alignment
// =============================================================================

#[test]
fn test_allocation_is_page_aligned() {
    let page = sgfx_shared::page_size();
    for format in [
        GpuPixelFormat::R8Unorm,
        GpuPixelFormat::R16Float,
        GpuPixelFormat::R32Float,
        GpuPixelFormat::Rgba8Unorm,
        GpuPixelFormat::Bgra8UnormSrgb,
        GpuPixelFormat::Rgba16Float,
        GpuPixelFormat::Rgba32Float,
    ] {
        for (width, height) in [(1, 1), (40, 40), (333, 17), (1920, 1080)] {
            let buffer = build(width, height, format);
            let base = buffer.descriptor().unwrap().base_address();
            assert_eq!(base.as_ptr() as usize % page, 0, "{format} {width}x{height}");
            assert_eq!(buffer.allocation_size() % page, 0, "{format} {width}x{height}");
            assert!(buffer.allocation_size() >= buffer.bytes_per_row() * height);
            assert!(buffer.bytes_per_row() >= width * format.bytes_per_pixel().unwrap());
        }
    }
}

#[test]
fn test_discrete_device_layout() {
    let context = HostContext::host(HostDeviceLimits::discrete());
    let buffer =
        HostSharedBuffer::new(&context, 40, 40, GpuPixelFormat::R8Unorm, SharedBufferOptions::default()).unwrap();
    assert_eq!(buffer.bytes_per_row(), 256);
    assert_eq!(buffer.layout().heap_size, 65536);
    assert!(buffer.allocation_size() >= 65536);
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn test_single_free_on_drop() {
    let allocator = CountingAllocator::default();
    let buffer = SharedGraphicsBuffer::with_allocator(
        &HostContext::host_default(),
        allocator.clone(),
        40,
        40,
        GpuPixelFormat::R8Unorm,
        SharedBufferOptions::default(),
    )
    .unwrap();
    assert_eq!((allocator.allocs(), allocator.frees()), (1, 0));

    drop(buffer);
    assert_eq!((allocator.allocs(), allocator.frees()), (1, 1));
}

#[test]
fn test_drawing_failure_frees_allocation() {
    let allocator = CountingAllocator::default();
    let options = SharedBufferOptions::default().with_color_space(ColorSpace::Srgb);
    let err = SharedGraphicsBuffer::with_allocator(
        &HostContext::host_default(),
        allocator.clone(),
        40,
        40,
        GpuPixelFormat::R8Unorm,
        options,
    )
    .unwrap_err();

    assert!(matches!(err, Error::DrawingSurfaceCreationFailed { .. }));
    assert_eq!((allocator.allocs(), allocator.frees()), (1, 1));
}

#[test]
fn test_texture_failure_frees_allocation() {
    let allocator = CountingAllocator::default();
    let context = SharedContext::new(NoTextureDevice::default(), HostVideoFactory, HostImageProcessing);
    let err = SharedGraphicsBuffer::with_allocator(
        &context,
        allocator.clone(),
        32,
        32,
        GpuPixelFormat::Rgba8Unorm,
        SharedBufferOptions::default(),
    )
    .unwrap_err();

    match err {
        Error::TextureCreationFailed { format, offset, reason, .. } => {
            assert_eq!(format, GpuPixelFormat::Rgba8Unorm);
            assert_eq!(offset, 0);
            assert!(reason.contains("no addressable data"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!((allocator.allocs(), allocator.frees()), (1, 1));
}

#[test]
fn test_buffer_failure_frees_allocation() {
    let allocator = CountingAllocator::default();
    let context = SharedContext::new(NoBufferDevice::default(), HostVideoFactory, HostImageProcessing);
    let err = SharedGraphicsBuffer::with_allocator(
        &context,
        allocator.clone(),
        32,
        32,
        GpuPixelFormat::Rgba8Unorm,
        SharedBufferOptions::default(),
    )
    .unwrap_err();

    match err {
        // 4096 bytes of rows, padded to the 16 KB heap alignment
        Error::BufferCreationFailed { length, .. } => assert_eq!(length, 16384),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!((allocator.allocs(), allocator.frees()), (1, 1));
}

#[test]
fn test_video_failure_frees_allocation() {
    let allocator = CountingAllocator::default();
    let context = SharedContext::new(HostDevice::default(), NoVideoFactory, HostImageProcessing);
    let err = SharedGraphicsBuffer::with_allocator(
        &context,
        allocator.clone(),
        32,
        32,
        GpuPixelFormat::Bgra8Unorm,
        SharedBufferOptions::default(),
    )
    .unwrap_err();

    match err {
        Error::VideoBufferCreationFailed { format, bytes_per_row, .. } => {
            assert_eq!(format, VideoPixelFormat::Bgra32);
            assert_eq!(bytes_per_row, 128);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!((allocator.allocs(), allocator.frees()), (1, 1));
}

#[test]
fn test_allocation_failure() {
    let allocator = CountingAllocator::with_limit(4096);
    let err = SharedGraphicsBuffer::with_allocator(
        &HostContext::host_default(),
        allocator.clone(),
        512,
        512,
        GpuPixelFormat::Rgba8Unorm,
        SharedBufferOptions::default(),
    )
    .unwrap_err();

    assert!(err.is_allocation_error());
    assert_eq!((allocator.allocs(), allocator.frees()), (0, 0));
}

#[test]
fn test_rejections_before_allocating() {
    let allocator = CountingAllocator::default();
    let context = HostContext::host_default();
    let attempt = |width, height, format, options| {
        SharedGraphicsBuffer::with_allocator(&context, allocator.clone(), width, height, format, options)
    };

    let private = SharedBufferOptions::default().with_storage_mode(StorageMode::Private);
    assert!(matches!(
        attempt(40, 40, GpuPixelFormat::R8Unorm, private),
        Err(Error::UnsupportedStorageMode { mode: StorageMode::Private })
    ));
    assert!(matches!(
        attempt(0, 40, GpuPixelFormat::R8Unorm, SharedBufferOptions::default()),
        Err(Error::InvalidDimensions { .. })
    ));
    assert!(matches!(
        attempt(40, 40, GpuPixelFormat::Bc1Rgba, SharedBufferOptions::default()),
        Err(Error::UnsupportedPixelFormat { .. })
    ));
    assert_eq!(allocator.allocs(), 0);
}

#[test]
fn test_managed_storage() {
    let options = SharedBufferOptions::default().with_storage_mode(StorageMode::Managed);
    let buffer =
        HostSharedBuffer::new(&HostContext::host_default(), 8, 8, GpuPixelFormat::R32Float, options).unwrap();
    assert_eq!(buffer.gpu_buffer().storage_mode(), StorageMode::Managed);
    assert_eq!(buffer.texture().storage_mode(), StorageMode::Managed);
}

// =============================================================================
// Drawing round trips
// =============================================================================

#[test]
fn test_fill_8bit_sum() {
    let mut buffer = build(40, 40, GpuPixelFormat::R8Unorm);
    buffer
        .drawing_surface_mut()
        .fill_rect(Rect::new(10, 10, 20, 20), Color::gray(1.0 / 255.0));

    assert_eq!(byte_sum(buffer.image_buffer()), 400);
    assert_eq!(buffer.image_buffer().row(9).unwrap().iter().map(|&b| b as usize).sum::<usize>(), 0);
    assert_eq!(buffer.image_buffer().row(10).unwrap()[10..30], [1u8; 20]);
}

#[test]
fn test_fill_half_float_sum() {
    let mut buffer = build(40, 40, GpuPixelFormat::R16Float);
    buffer
        .drawing_surface_mut()
        .fill_rect(Rect::new(10, 10, 20, 20), Color::WHITE);

    let sum: f32 = buffer
        .image_buffer()
        .rows()
        .flat_map(|row| row[..80].chunks_exact(2))
        .map(|px| f16::from_le_bytes([px[0], px[1]]).to_f32())
        .sum();
    assert_relative_eq!(sum, 400.0);

    let bpr = buffer.bytes_per_row();
    let tensor = buffer
        .tensor_view_with_strides(&[40, 40], &[bpr / 2, 1], TensorDataType::Float16)
        .unwrap();
    assert_eq!(tensor.get::<f16>(&[15, 15]), Some(f16::ONE));
    assert_eq!(tensor.get::<f16>(&[5, 15]), Some(f16::ZERO));
}

#[test]
fn test_gray_alpha_half_float_buffer() {
    let mut buffer = build(16, 16, GpuPixelFormat::Rg16Float);
    assert_eq!(buffer.video_format(), VideoPixelFormat::TwoComponent16Half);
    assert_eq!(buffer.color_space(), ColorSpace::ExtendedLinearGray);

    buffer.drawing_surface_mut().fill(Color::rgba(1.0, 1.0, 1.0, 0.5));
    let pixel: Vec<f32> = buffer.image_buffer().row(3).unwrap()[..4]
        .chunks_exact(2)
        .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
        .collect();
    assert_eq!(pixel, vec![0.5, 0.5]);
}

#[test]
fn test_tensor_bounds_follow_row_stride() {
    let buffer = build(40, 40, GpuPixelFormat::R8Unorm);
    let available = buffer.bytes_per_row() * 40;

    // Exactly the descriptor's bytes.
    assert!(buffer
        .tensor_view_with_strides(&[available / 4], &[1], TensorDataType::Float32)
        .is_ok());
    let err = buffer
        .tensor_view_with_strides(&[available / 4 + 1], &[1], TensorDataType::Float32)
        .unwrap_err();
    assert!(matches!(err, Error::OutOfBounds { .. }));
}
