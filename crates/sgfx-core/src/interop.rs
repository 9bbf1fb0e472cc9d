//! Collaborator contracts for zero-copy interop.
//!
//! The memory-sharing layer never talks to a GPU, a video pipeline or an
//! image-processing library directly. It consumes them through the traits in
//! this module, so that one allocation can be wrapped by whichever backend
//! is plugged in.
//!
//! # Traits
//!
//! - [`GpuDevice`] - no-copy buffers, textures over buffers, alignment queries
//! - [`VideoBufferFactory`] - no-copy platform video buffers
//! - [`ImageProcessing`] - row-stride alignment of CPU image buffers
//! - [`PageAllocator`] - raw page-aligned memory
//!
//! # Ownership
//!
//! Every wrap call receives memory it does not own. Implementations must
//! never free it; the caller guarantees the memory outlives the returned
//! object (hence the `unsafe` on the wrapping calls).

use std::alloc::Layout;
use std::ptr::NonNull;

use bitflags::bitflags;

use crate::format::{GpuPixelFormat, VideoPixelFormat};
use crate::Result;

// =============================================================================
// Resource options
// =============================================================================

/// Where a GPU resource lives and who can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageMode {
    /// System memory visible to both CPU and GPU.
    #[default]
    Shared,
    /// CPU and GPU copies kept in sync explicitly.
    Managed,
    /// GPU-only memory.
    Private,
    /// Tile memory that never reaches system memory.
    Memoryless,
}

impl StorageMode {
    /// Whether a resource in this mode can alias CPU-allocated memory.
    #[inline]
    pub const fn can_alias_cpu(&self) -> bool {
        matches!(self, StorageMode::Shared | StorageMode::Managed)
    }

    /// Resource options selecting this storage mode.
    pub const fn resource_options(&self) -> ResourceOptions {
        match self {
            StorageMode::Shared => ResourceOptions::STORAGE_SHARED,
            StorageMode::Managed => ResourceOptions::STORAGE_MANAGED,
            StorageMode::Private => ResourceOptions::STORAGE_PRIVATE,
            StorageMode::Memoryless => ResourceOptions::STORAGE_MEMORYLESS,
        }
    }
}

bitflags! {
    /// How a texture will be accessed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled or read in shaders.
        const SHADER_READ = 1 << 0;
        /// Written in shaders.
        const SHADER_WRITE = 1 << 1;
        /// Attached as a render target.
        const RENDER_TARGET = 1 << 2;
        /// Reinterpreted through a view of another pixel format.
        const PIXEL_FORMAT_VIEW = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SHADER_READ | Self::SHADER_WRITE | Self::RENDER_TARGET
    }
}

bitflags! {
    /// Buffer allocation options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceOptions: u32 {
        /// Write-combined CPU cache mode.
        const CPU_CACHE_WRITE_COMBINED = 1 << 0;
        /// Shared storage.
        const STORAGE_SHARED = 1 << 4;
        /// Managed storage.
        const STORAGE_MANAGED = 1 << 5;
        /// Private storage.
        const STORAGE_PRIVATE = 1 << 6;
        /// Memoryless storage.
        const STORAGE_MEMORYLESS = 1 << 7;
        /// Hazards are tracked by the caller.
        const HAZARD_TRACKING_UNTRACKED = 1 << 8;
    }
}

impl ResourceOptions {
    /// Storage mode these options select; shared when none is set.
    pub fn storage_mode(&self) -> StorageMode {
        if self.contains(Self::STORAGE_PRIVATE) {
            StorageMode::Private
        } else if self.contains(Self::STORAGE_MEMORYLESS) {
            StorageMode::Memoryless
        } else if self.contains(Self::STORAGE_MANAGED) {
            StorageMode::Managed
        } else {
            StorageMode::Shared
        }
    }
}

/// Shape, format and usage of a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Pixel format.
    pub format: GpuPixelFormat,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Intended usage.
    pub usage: TextureUsage,
    /// Storage mode.
    pub storage_mode: StorageMode,
}

impl TextureDescriptor {
    /// Shared-storage 2D texture with default usage.
    pub fn new_2d(format: GpuPixelFormat, width: usize, height: usize) -> Self {
        Self {
            format,
            width,
            height,
            usage: TextureUsage::default(),
            storage_mode: StorageMode::Shared,
        }
    }

    /// Replaces the usage flags.
    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Replaces the storage mode.
    pub fn with_storage_mode(mut self, storage_mode: StorageMode) -> Self {
        self.storage_mode = storage_mode;
        self
    }
}

/// Size and alignment a heap-resident resource requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeAndAlign {
    /// Bytes.
    pub size: usize,
    /// Required base alignment.
    pub align: usize,
}

/// Compatibility keys passed when wrapping memory as a video buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoBufferAttributes {
    /// Bitmap images may be created from the buffer.
    pub bitmap_image_compatible: bool,
    /// Drawing surfaces may be created over the buffer.
    pub drawing_surface_compatible: bool,
    /// GPU textures may be created from the buffer.
    pub gpu_compatible: bool,
}

impl VideoBufferAttributes {
    /// Every compatibility key set.
    pub const fn interop() -> Self {
        Self {
            bitmap_image_compatible: true,
            drawing_surface_compatible: true,
            gpu_compatible: true,
        }
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// A GPU buffer viewed from the CPU.
pub trait GpuBuffer {
    /// CPU address of the buffer contents.
    fn contents(&self) -> NonNull<u8>;

    /// Length in bytes.
    fn length(&self) -> usize;
}

/// GPU device: wraps memory and materializes textures.
pub trait GpuDevice {
    /// Buffer handle type.
    type Buffer: GpuBuffer;
    /// Texture handle type.
    type Texture;

    /// Wraps `length` bytes at `ptr` as a buffer without copying.
    ///
    /// The buffer never frees the memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `length` bytes for as long
    /// as the returned buffer, or anything derived from it, is alive.
    unsafe fn new_buffer_no_copy(
        &self,
        ptr: NonNull<u8>,
        length: usize,
        options: ResourceOptions,
    ) -> Result<Self::Buffer>;

    /// Creates a texture over `buffer` starting at `offset` with the given row stride.
    fn new_texture_from_buffer(
        &self,
        buffer: &Self::Buffer,
        descriptor: &TextureDescriptor,
        offset: usize,
        bytes_per_row: usize,
    ) -> Result<Self::Texture>;

    /// Row-stride alignment required to build a texture of `format` over a buffer.
    fn minimum_texture_buffer_alignment(&self, format: GpuPixelFormat) -> usize;

    /// Row-stride alignment required for a linear texture of `format`.
    fn minimum_linear_texture_alignment(&self, format: GpuPixelFormat) -> usize;

    /// Size and alignment of `descriptor` when placed on a heap.
    fn heap_texture_size_and_align(&self, descriptor: &TextureDescriptor) -> SizeAndAlign;
}

/// Platform video buffer factory.
pub trait VideoBufferFactory {
    /// Video buffer handle type.
    type VideoBuffer;

    /// Wraps memory as a video buffer without copying.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `bytes_per_row * height` bytes while the
    /// returned buffer is alive. The buffer never frees it.
    unsafe fn create_no_copy(
        &self,
        width: usize,
        height: usize,
        format: VideoPixelFormat,
        ptr: NonNull<u8>,
        bytes_per_row: usize,
        attributes: &VideoBufferAttributes,
    ) -> Result<Self::VideoBuffer>;
}

/// Row-stride based CPU image processing library.
pub trait ImageProcessing {
    /// Row alignment the library needs for an externally supplied buffer.
    fn required_alignment(&self, height: usize, width: usize, bits_per_component: usize)
    -> Result<usize>;
}

/// Raw page allocator.
///
/// Cloned into every allocation it hands out so the allocation can free
/// itself.
pub trait PageAllocator: Clone {
    /// Virtual memory page size in bytes.
    fn page_size(&self) -> usize;

    /// Allocates memory for `layout`; the contents are zeroed.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Frees memory previously returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_modes() {
        assert!(StorageMode::Shared.can_alias_cpu());
        assert!(StorageMode::Managed.can_alias_cpu());
        assert!(!StorageMode::Private.can_alias_cpu());
        assert!(!StorageMode::Memoryless.can_alias_cpu());
    }

    #[test]
    fn test_resource_options_round_trip() {
        for mode in [
            StorageMode::Shared,
            StorageMode::Managed,
            StorageMode::Private,
            StorageMode::Memoryless,
        ] {
            assert_eq!(mode.resource_options().storage_mode(), mode);
        }
        assert_eq!(ResourceOptions::empty().storage_mode(), StorageMode::Shared);
    }

    #[test]
    fn test_default_usage() {
        let usage = TextureUsage::default();
        assert!(usage.contains(TextureUsage::SHADER_READ | TextureUsage::RENDER_TARGET));
        assert!(!usage.contains(TextureUsage::PIXEL_FORMAT_VIEW));
    }
}
