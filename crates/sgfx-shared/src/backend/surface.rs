//! Host hardware surfaces.
//!
//! A [`HostSurface`] is a block of page-aligned memory laid out as one
//! packed pixel plane or several sub-sampled planes, the kind of surface a
//! video decoder or compositor hands between processes.
//!
//! Packed surfaces describe themselves as a single plane through
//! [`DescriptorProvider`] and report zero planes. Planar surfaces report
//! no surface-wide geometry (`bytes_per_row` is zero) and describe each
//! plane through [`MultiplanarDescriptorProvider`].

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

use sgfx_core::{
    checked_align_up, DescriptorProvider, Error, MultiplanarDescriptorProvider, RectangularDataDescriptor, Result,
    VideoPixelFormat,
};
use tracing::debug;

use crate::memory::PageAllocation;

/// Row and plane alignment of surfaces.
pub const SURFACE_ROW_ALIGNMENT: usize = 64;

static NEXT_SURFACE_ID: AtomicU32 = AtomicU32::new(1);

/// Geometry of one plane inside a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset from the surface base.
    pub offset: usize,
    /// Width in elements.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
    /// Bytes per element.
    pub bytes_per_element: usize,
    /// Row stride in bytes.
    pub bytes_per_row: usize,
}

impl PlaneLayout {
    /// Bytes covered by the plane's rows.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.bytes_per_row * self.height
    }
}

/// Plane geometry of a `width` x `height` surface of `format`.
///
/// Packed formats yield one plane.
pub(crate) fn plane_layouts(width: usize, height: usize, format: VideoPixelFormat) -> Result<Vec<PlaneLayout>> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height, "empty surface"));
    }
    // (width divisor, height divisor, bytes per element) per plane
    let planes: &[(usize, usize, usize)] = match format {
        VideoPixelFormat::YCbCr420BiPlanarFullRange | VideoPixelFormat::YCbCr420BiPlanarVideoRange => {
            &[(1, 1, 1), (2, 2, 2)]
        }
        _ => match format.bytes_per_pixel() {
            Some(1) => &[(1, 1, 1)],
            Some(2) => &[(1, 1, 2)],
            Some(3) => &[(1, 1, 3)],
            Some(4) => &[(1, 1, 4)],
            Some(8) => &[(1, 1, 8)],
            Some(16) => &[(1, 1, 16)],
            _ => return Err(Error::unsupported_format(format.name())),
        },
    };

    let overflow = || Error::invalid_dimensions(width, height, "surface size overflows");
    let mut offset = 0usize;
    let mut layouts = Vec::with_capacity(planes.len());
    for &(x_div, y_div, bytes_per_element) in planes {
        let plane_width = width.div_ceil(x_div);
        let plane_height = height.div_ceil(y_div);
        let bytes_per_row = plane_width
            .checked_mul(bytes_per_element)
            .and_then(|row| checked_align_up(row, SURFACE_ROW_ALIGNMENT))
            .ok_or_else(overflow)?;
        layouts.push(PlaneLayout {
            offset,
            width: plane_width,
            height: plane_height,
            bytes_per_element,
            bytes_per_row,
        });
        offset = bytes_per_row
            .checked_mul(plane_height)
            .and_then(|size| size.checked_add(offset))
            .and_then(|end| checked_align_up(end, SURFACE_ROW_ALIGNMENT))
            .ok_or_else(overflow)?;
    }
    Ok(layouts)
}

/// A page-aligned pixel surface, packed or planar.
pub struct HostSurface {
    id: u32,
    width: usize,
    height: usize,
    format: VideoPixelFormat,
    planes: Vec<PlaneLayout>,
    allocation: PageAllocation,
}

impl HostSurface {
    /// Allocates a zeroed surface.
    pub fn new(width: usize, height: usize, format: VideoPixelFormat) -> Result<Self> {
        let planes = plane_layouts(width, height, format)?;
        let size = planes
            .last()
            .map(|plane| plane.offset + plane.data_length())
            .unwrap_or(0);
        let allocation = PageAllocation::system(size)?;
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(id, width, height, %format, size = allocation.len(), "host surface");
        Ok(Self {
            id,
            width,
            height,
            format,
            planes,
            allocation,
        })
    }

    /// Process-unique identifier.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
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

    /// Pixel format.
    #[inline]
    pub fn pixel_format(&self) -> VideoPixelFormat {
        self.format
    }

    /// Whether the surface has more than one plane.
    #[inline]
    pub fn is_planar(&self) -> bool {
        self.format.is_planar()
    }

    /// Bytes per element of a packed surface; zero when planar.
    pub fn bytes_per_element(&self) -> usize {
        match self.is_planar() {
            true => 0,
            false => self.planes[0].bytes_per_element,
        }
    }

    /// Row stride of a packed surface; zero when planar.
    pub fn bytes_per_row(&self) -> usize {
        match self.is_planar() {
            true => 0,
            false => self.planes[0].bytes_per_row,
        }
    }

    /// Layout of plane `plane`, for planar surfaces.
    pub fn plane(&self, plane: usize) -> Option<&PlaneLayout> {
        self.is_planar().then(|| self.planes.get(plane)).flatten()
    }

    /// Allocated bytes.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.allocation.len()
    }

    /// Base address.
    #[inline]
    pub fn base_address(&self) -> NonNull<u8> {
        self.allocation.as_ptr()
    }

    /// Whole surface memory.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.allocation.as_slice()
    }

    /// Whole surface memory, mutably.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.allocation.as_mut_slice()
    }

    fn plane_base(&self, layout: &PlaneLayout) -> NonNull<u8> {
        // SAFETY: plane offsets lie inside the allocation.
        unsafe { NonNull::new_unchecked(self.allocation.as_ptr().as_ptr().add(layout.offset)) }
    }
}

impl fmt::Debug for HostSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSurface")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .finish()
    }
}

impl DescriptorProvider for HostSurface {
    fn descriptor(&self) -> Result<RectangularDataDescriptor<'_>> {
        let bytes_per_row = self.bytes_per_row();
        if self.width == 0 || self.height == 0 || bytes_per_row == 0 {
            return Err(Error::MissingData);
        }
        // SAFETY: the allocation covers every row and lives as long as `self`.
        Ok(unsafe {
            RectangularDataDescriptor::from_raw_parts(self.width, self.height, self.base_address(), bytes_per_row)
        })
    }
}

impl MultiplanarDescriptorProvider for HostSurface {
    fn plane_count(&self) -> usize {
        match self.is_planar() {
            true => self.planes.len(),
            false => 0,
        }
    }

    fn plane_descriptor(&self, plane: usize) -> Result<RectangularDataDescriptor<'_>> {
        let layout = self.plane(plane).ok_or(Error::MissingDataOfPlane(plane))?;
        if layout.width == 0 || layout.height == 0 || layout.bytes_per_row == 0 {
            return Err(Error::MissingDataOfPlane(plane));
        }
        // SAFETY: as for `descriptor`, offset by the plane's start.
        Ok(unsafe {
            RectangularDataDescriptor::from_raw_parts(
                layout.width,
                layout.height,
                self.plane_base(layout),
                layout.bytes_per_row,
            )
        })
    }
}
