//! Page-aligned memory.
//!
//! Provides system page size detection, the default [`PageAllocator`], the
//! RAII [`PageAllocation`] every shared resource is built on, and an
//! environment-configured allocation budget.
//!
//! # Environment Variables
//!
//! - `SGFX_MAX_ALLOC_MB` - Largest single page allocation, in megabytes
//!
//! # Ownership
//!
//! A [`PageAllocation`] is the only owner of its memory. It frees the memory
//! exactly once, when dropped, through the allocator it was created with.
//! Views built over it (GPU buffers, video buffers, drawing surfaces) hold
//! plain addresses and never free anything.

use std::alloc::{self, Layout};
use std::env;
use std::fmt;
use std::ptr::NonNull;
use std::sync::OnceLock;

use sgfx_core::interop::PageAllocator;
use sgfx_core::{checked_align_up, Error, Result};
use tracing::trace;

/// Page size assumed when the system cannot report one.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

/// Environment variable capping a single allocation, in megabytes.
pub const MAX_ALLOC_ENV: &str = "SGFX_MAX_ALLOC_MB";

/// Cache for page size detection.
static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Cache for the allocation budget.
static MAX_ALLOCATION: OnceLock<Option<usize>> = OnceLock::new();

/// Virtual memory page size of this system.
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(detect_page_size)
}

#[cfg(unix)]
fn detect_page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 && (size as usize).is_power_of_two() {
        size as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(not(unix))]
fn detect_page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

/// Largest single allocation allowed, from `SGFX_MAX_ALLOC_MB`.
///
/// `None` means unlimited. Read once per process.
pub fn max_allocation() -> Option<usize> {
    *MAX_ALLOCATION.get_or_init(|| parse_max_alloc_mb(env::var(MAX_ALLOC_ENV).ok().as_deref()))
}

fn parse_max_alloc_mb(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&mb| mb > 0)
        .and_then(|mb| mb.checked_mul(1024 * 1024))
}

/// Whether `ptr` sits on a page boundary.
#[inline]
pub fn is_page_aligned(ptr: *const u8) -> bool {
    ptr as usize % page_size() == 0
}

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: usize) -> String {
    let bytes = bytes as u64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

// =============================================================================
// System allocator
// =============================================================================

/// Page allocator backed by the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPageAllocator;

impl PageAllocator for SystemPageAllocator {
    fn page_size(&self) -> usize {
        page_size()
    }

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let size = layout.size();
        if size == 0 {
            return Err(Error::allocation_failed(0, "zero-sized allocation"));
        }
        if let Some(limit) = max_allocation().filter(|&limit| size > limit) {
            return Err(Error::allocation_failed(
                size,
                format!("exceeds {MAX_ALLOC_ENV} budget of {}", format_bytes(limit)),
            ));
        }
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).ok_or_else(|| Error::allocation_failed(size, "out of memory"))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

// =============================================================================
// Allocation guard
// =============================================================================

/// One page-aligned, page-multiple block of zeroed memory.
///
/// Freed on drop. Dropping it on an early `?` return is what rolls back a
/// half-built resource.
pub struct PageAllocation<A: PageAllocator = SystemPageAllocator> {
    ptr: NonNull<u8>,
    layout: Layout,
    allocator: A,
}

// The allocation is plain memory owned by this value.
unsafe impl<A: PageAllocator + Send> Send for PageAllocation<A> {}
unsafe impl<A: PageAllocator + Sync> Sync for PageAllocation<A> {}

impl PageAllocation<SystemPageAllocator> {
    /// Allocates at least `size` bytes from the system.
    pub fn system(size: usize) -> Result<Self> {
        Self::new(SystemPageAllocator, size)
    }
}

impl<A: PageAllocator> PageAllocation<A> {
    /// Allocates `size` bytes rounded up to whole pages, page aligned.
    pub fn new(allocator: A, size: usize) -> Result<Self> {
        let page = allocator.page_size();
        let rounded = checked_align_up(size, page)
            .filter(|&rounded| rounded > 0)
            .ok_or_else(|| Error::allocation_failed(size, "size is zero or overflows"))?;
        let layout = Layout::from_size_align(rounded, page)
            .map_err(|err| Error::allocation_failed(rounded, err.to_string()))?;
        let ptr = allocator.allocate(layout)?;
        trace!(size = rounded, page, ptr = ?ptr, "page allocation");
        Ok(Self {
            ptr,
            layout,
            allocator,
        })
    }

    /// Base address.
    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Length in bytes (a whole number of pages).
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always `false`; allocations are at least one page.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Alignment, equal to the allocator's page size.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.layout.align()
    }

    /// The allocator this memory returns to.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Contents.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the allocation is valid and initialized for `len` bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    /// Contents, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` is exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl<A: PageAllocator> Drop for PageAllocation<A> {
    fn drop(&mut self) {
        trace!(size = self.layout.size(), ptr = ?self.ptr, "page free");
        // SAFETY: `ptr` came from this allocator with this layout and is
        // freed nowhere else.
        unsafe { self.allocator.deallocate(self.ptr, self.layout) }
    }
}

impl<A: PageAllocator> fmt::Debug for PageAllocation<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAllocation")
            .field("ptr", &self.ptr)
            .field("len", &self.layout.size())
            .field("page_size", &self.layout.align())
            .finish()
    }
}
