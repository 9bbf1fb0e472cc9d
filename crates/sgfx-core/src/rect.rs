//! Pixel rectangles.
//!
//! # Coordinate System
//!
//! All coordinates use the image convention:
//! - Origin (0, 0) is at the **top-left** corner
//! - X increases to the right
//! - Y increases downward, so row `y` starts at `y * bytes_per_row`
//!
//! ```rust
//! use sgfx_core::Rect;
//!
//! let rect = Rect::new(10, 10, 20, 20);
//! assert!(rect.contains(10, 10));
//! assert!(!rect.contains(30, 30));
//! assert_eq!(rect.area(), 400);
//! ```

use std::fmt;

/// A rectangle defined by origin (x, y) and dimensions (width, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: usize,
    /// Top edge (inclusive).
    pub y: usize,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl Rect {
    /// Creates a new rectangle.
    #[inline]
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin covering `width` x `height`.
    #[inline]
    pub const fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> usize {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> usize {
        self.y.saturating_add(self.height)
    }

    /// Area in pixels.
    #[inline]
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if the point is inside (left/top inclusive,
    /// right/bottom exclusive).
    #[inline]
    pub const fn contains(&self, px: usize, py: usize) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Overlap with another rectangle, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (x < right && y < bottom).then(|| Rect::new(x, y, right - x, bottom - y))
    }

    /// Clips to an image of `width` x `height`.
    #[inline]
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<Rect> {
        self.intersect(&Rect::from_size(width, height))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let rect = Rect::new(10, 20, 100, 50);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 70);
        assert_eq!(rect.area(), 5000);
        assert!(!rect.is_empty());
        assert!(Rect::new(5, 5, 0, 10).is_empty());
    }

    #[test]
    fn test_intersect() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert_eq!(a.intersect(&b), Some(Rect::new(50, 50, 50, 50)));
        assert_eq!(a.intersect(&Rect::new(200, 0, 10, 10)), None);
    }

    #[test]
    fn test_clamp_to() {
        let rect = Rect::new(30, 30, 20, 20);
        assert_eq!(rect.clamp_to(40, 40), Some(Rect::new(30, 30, 10, 10)));
        assert_eq!(Rect::new(50, 0, 5, 5).clamp_to(40, 40), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Rect::new(10, 10, 20, 20).to_string(), "20x20+10+10");
    }
}
