use serde::{Deserialize, Serialize};

use crate::{Point, WorldError};

/// An axis-aligned rectangle in integer room coordinates.
///
/// Sizes are always positive; [`Rect::new`] refuses anything else so that
/// collision code never has to reason about empty or inverted boxes.
/// Overlap follows the usual half-open convention: two rectangles that only
/// share an edge do not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    width: i32,
    height: i32,
}

impl Rect {
    /// Creates a rectangle with its top-left corner at `(x, y)`.
    ///
    /// Returns `Err(WorldError::InvalidDimensions)` if either size is zero or negative.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self, WorldError> {
        if width <= 0 || height <= 0 {
            return Err(WorldError::InvalidDimensions { width, height });
        }
        Ok(Rect {
            x,
            y,
            width,
            height,
        })
    }

    /// Creates a rectangle of the given size centered on `center`.
    pub fn centered(center: Point, width: i32, height: i32) -> Result<Self, WorldError> {
        Rect::new(center.x - width / 2, center.y - height / 2, width, height)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Moves the rectangle so its left edge sits at `x`.
    #[inline]
    pub fn set_left(&mut self, x: i32) {
        self.x = x;
    }

    /// Moves the rectangle so its right edge sits at `x`.
    #[inline]
    pub fn set_right(&mut self, x: i32) {
        self.x = x - self.width;
    }

    #[inline]
    pub fn set_top(&mut self, y: i32) {
        self.y = y;
    }

    #[inline]
    pub fn set_bottom(&mut self, y: i32) {
        self.y = y - self.height;
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }

    /// Moves the rectangle so its center sits at `center`.
    pub fn set_center(&mut self, center: Point) {
        self.x = center.x - self.width / 2;
        self.y = center.y - self.height / 2;
    }

    /// Returns a copy shifted by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Returns a copy grown by `dw`/`dh` around the same center.
    ///
    /// Shrinking below one pixel is clamped so the result stays a valid rectangle.
    pub fn inflate(&self, dw: i32, dh: i32) -> Rect {
        let width = (self.width + dw).max(1);
        let height = (self.height + dh).max(1);
        Rect {
            x: self.x - (width - self.width) / 2,
            y: self.y - (height - self.height) / 2,
            width,
            height,
        }
    }

    /// True if the interiors of the two rectangles intersect.
    #[inline]
    pub fn collides(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True if `other` lies entirely inside `self` (edges may coincide).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// True if this rectangle collides with any rectangle in `others`.
    pub fn collides_any<'a>(&self, others: impl IntoIterator<Item = &'a Rect>) -> bool {
        others.into_iter().any(|other| self.collides(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_sizes() {
        assert_eq!(
            Rect::new(0, 0, 0, 10),
            Err(WorldError::InvalidDimensions {
                width: 0,
                height: 10
            })
        );
        assert!(Rect::new(0, 0, 10, -1).is_err());
        assert!(Rect::new(-5, -5, 1, 1).is_ok());
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let a = Rect::new(0, 0, 10, 10).unwrap();
        let b = Rect::new(10, 0, 10, 10).unwrap();
        let c = Rect::new(9, 9, 10, 10).unwrap();
        assert!(!a.collides(&b));
        assert!(a.collides(&c));
        assert!(c.collides(&a));
    }

    #[test]
    fn edge_setters_keep_size() {
        let mut r = Rect::new(100, 100, 40, 60).unwrap();
        r.set_right(150);
        assert_eq!((r.x, r.right()), (110, 150));
        r.set_bottom(100);
        assert_eq!((r.y, r.bottom()), (40, 100));
        assert_eq!((r.width(), r.height()), (40, 60));
    }

    #[test]
    fn inflate_keeps_center() {
        let r = Rect::new(10, 10, 20, 20).unwrap();
        let grown = r.inflate(10, 10);
        assert_eq!(grown.center(), r.center());
        assert_eq!(grown.width(), 30);
        assert_eq!(r.inflate(-100, -100).width(), 1);
    }
}
