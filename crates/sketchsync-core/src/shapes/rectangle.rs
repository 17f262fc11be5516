//! Rectangle shape.

use super::{ShapeColor, ShapeTrait};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// An axis-aligned filled rectangle.
///
/// Defined by an upper-left corner (x1, y1) and a lower-right corner
/// (x2, y2) with `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    pub color: ShapeColor,
}

impl Rectangle {
    /// Create a rectangle from any two opposite corners.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, color: ShapeColor) -> Self {
        let mut rect = Self {
            x1,
            y1,
            x2,
            y2,
            color,
        };
        rect.set_corners(x1, y1, x2, y2);
        rect
    }

    /// Degenerate rectangle at a single point, as started by a mouse press.
    pub fn at(x: i32, y: i32, color: ShapeColor) -> Self {
        Self::new(x, y, x, y, color)
    }

    /// Reset both corners, normalizing their order.
    pub fn set_corners(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.x1 = x1.min(x2);
        self.y1 = y1.min(y2);
        self.x2 = x1.max(x2);
        self.y2 = y1.max(y2);
    }

    /// Upper-left and lower-right corners.
    pub fn corners(&self) -> (i32, i32, i32, i32) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

impl ShapeTrait for Rectangle {
    const NAME: &'static str = "rectangle";

    fn color(&self) -> ShapeColor {
        self.color
    }

    fn set_color(&mut self, color: ShapeColor) {
        self.color = color;
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        self.x1 += dx;
        self.y1 += dy;
        self.x2 += dx;
        self.y2 += dy;
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            f64::from(self.x1),
            f64::from(self.y1),
            f64::from(self.x2),
            f64::from(self.y2),
        )
    }

    fn params(&self) -> Vec<i32> {
        vec![self.x1, self.y1, self.x2, self.y2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_from_corners() {
        let rect = Rectangle::new(100, 100, 50, 40, ShapeColor::black());
        assert_eq!(rect.corners(), (50, 40, 100, 100));
        assert_eq!(rect.width(), 50);
        assert_eq!(rect.height(), 60);
    }

    #[test]
    fn test_hit_test() {
        let rect = Rectangle::new(0, 0, 100, 100, ShapeColor::black());
        assert!(rect.contains(50, 50));
        assert!(rect.contains(0, 0));
        assert!(rect.contains(100, 100));
        assert!(!rect.contains(101, 50));
        assert!(!rect.contains(50, -1));
    }

    #[test]
    fn test_degenerate_rectangle() {
        let rect = Rectangle::at(7, 7, ShapeColor::black());
        assert!(rect.contains(7, 7));
        assert!(!rect.contains(8, 7));
        assert_eq!(rect.width(), 0);
    }

    #[test]
    fn test_move_by() {
        let mut rect = Rectangle::new(0, 0, 10, 20, ShapeColor::black());
        rect.move_by(5, -5);
        assert_eq!(rect.corners(), (5, -5, 15, 15));
    }
}
