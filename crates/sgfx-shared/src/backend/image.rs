//! Host image processing.

use sgfx_core::interop::ImageProcessing;
use sgfx_core::{ImageBuffer, Result};

/// [`ImageProcessing`] backed by [`ImageBuffer::required_layout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HostImageProcessing;

impl ImageProcessing for HostImageProcessing {
    fn required_alignment(&self, height: usize, width: usize, bits_per_component: usize) -> Result<usize> {
        // Queried without allocating, the same geometry the buffer will use.
        ImageBuffer::required_layout(height, width, bits_per_component).map(|layout| layout.alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert_eq!(HostImageProcessing.required_alignment(40, 40, 8).unwrap(), 16);
        assert_eq!(HostImageProcessing.required_alignment(40, 40, 32).unwrap(), 64);
        assert!(HostImageProcessing.required_alignment(0, 40, 8).is_err());
    }
}
