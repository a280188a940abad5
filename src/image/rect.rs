//! Floating-point rectangles.
//!
//! [`Rect`] is used for bounding boxes in source-frame space as well as for draw rectangles in
//! surface space. The coordinate space a [`Rect`] lives in is determined by whoever created it.

use std::fmt;

use nalgebra::{Point2, Vector2};

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Point2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: Point2::new(x_center, y_center),
            size: Vector2::new(width, height),
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Creates a rectangle from the coordinates of its four edges.
    ///
    /// `left` must not be greater than `right`, and `top` must not be greater than `bottom`.
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::from_top_left(left, top, right - left, bottom - top)
    }

    /// Computes the (axis-aligned) bounding rectangle that encompasses `points`.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = Point2<f32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let first = iter.next()?;
        let (mut min, mut max) = (first, first);

        for pt in iter {
            min = min.inf(&pt);
            max = max.sup(&pt);
        }

        Some(Self::from_edges(min.x, min.y, max.x, max.y))
    }

    /// Grows this rectangle by adding `x` to its left and right side, and `y` to its top and
    /// bottom side.
    #[must_use]
    pub fn pad(&self, x: f32, y: f32) -> Self {
        Self {
            center: self.center,
            size: self.size + Vector2::new(x * 2.0, y * 2.0),
        }
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.center - self.size * 0.5
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.top_left().x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.top_left().y
    }

    /// Returns the X coordinate of the right side of the rectangle.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x() + self.width()
    }

    /// Returns the Y coordinate of the bottom side of the rectangle.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y() + self.height()
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.center
    }

    /// Returns whether all coordinates are finite and the rectangle covers a non-zero area.
    pub fn is_drawable(&self) -> bool {
        self.center.coords.iter().chain(self.size.iter()).all(|c| c.is_finite())
            && self.width() > 0.0
            && self.height() > 0.0
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] when the intersection is empty (ie. the rectangles do not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.top_left().sup(&other.top_left());
        let max = Point2::new(self.right(), self.bottom())
            .inf(&Point2::new(other.right(), other.bottom()));
        if min.x >= max.x || min.y >= max.y {
            return None;
        }

        Some(Rect::from_edges(min.x, min.y, max.x, max.y))
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x(),
            self.y(),
            self.width(),
            self.height()
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn bounding() {
        let rect = Rect::bounding([
            Point2::new(100.0, 300.0),
            Point2::new(200.0, 280.0),
            Point2::new(110.0, 450.0),
        ])
        .unwrap();
        assert_eq!(rect, Rect::from_edges(100.0, 280.0, 200.0, 450.0));
        assert!(Rect::bounding([]).is_none());
    }

    #[test]
    fn pad_keeps_center() {
        let rect = Rect::from_top_left(10.0, 20.0, 100.0, 50.0).pad(5.0, 10.0);
        assert_relative_eq!(rect.x(), 5.0);
        assert_relative_eq!(rect.y(), 10.0);
        assert_relative_eq!(rect.width(), 110.0);
        assert_relative_eq!(rect.height(), 70.0);
    }

    #[test]
    fn intersection() {
        let a = Rect::from_top_left(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_top_left(5.0, -5.0, 10.0, 10.0);
        assert_eq!(
            a.intersection(&b),
            Some(Rect::from_top_left(5.0, 0.0, 5.0, 5.0))
        );

        let far = Rect::from_top_left(20.0, 20.0, 1.0, 1.0);
        assert_eq!(a.intersection(&far), None);
    }

    #[test]
    fn drawable() {
        assert!(Rect::from_top_left(0.0, 0.0, 1.0, 1.0).is_drawable());
        assert!(!Rect::from_top_left(0.0, 0.0, 0.0, 1.0).is_drawable());
        assert!(!Rect::from_top_left(f32::NAN, 0.0, 1.0, 1.0).is_drawable());
        assert!(!Rect::from_top_left(0.0, 0.0, f32::INFINITY, 1.0).is_drawable());
    }
}
