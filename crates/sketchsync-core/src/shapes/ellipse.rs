//! Ellipse shape.

use super::{ShapeColor, ShapeTrait};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An axis-aligned filled ellipse, described by its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ellipse {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    pub color: ShapeColor,
}

impl Ellipse {
    /// Create an ellipse inscribed in the box spanned by two opposite corners.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, color: ShapeColor) -> Self {
        let mut ellipse = Self {
            x1,
            y1,
            x2,
            y2,
            color,
        };
        ellipse.set_corners(x1, y1, x2, y2);
        ellipse
    }

    /// Reset the bounding box, normalizing corner order.
    pub fn set_corners(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.x1 = x1.min(x2);
        self.y1 = y1.min(y2);
        self.x2 = x1.max(x2);
        self.y2 = y1.max(y2);
    }

    pub fn center(&self) -> Point {
        Point::new(
            f64::from(self.x1 + self.x2) / 2.0,
            f64::from(self.y1 + self.y2) / 2.0,
        )
    }

    /// Horizontal and vertical radii.
    pub fn radii(&self) -> (f64, f64) {
        (
            f64::from(self.x2 - self.x1) / 2.0,
            f64::from(self.y2 - self.y1) / 2.0,
        )
    }
}

impl ShapeTrait for Ellipse {
    const NAME: &'static str = "ellipse";

    fn color(&self) -> ShapeColor {
        self.color
    }

    fn set_color(&mut self, color: ShapeColor) {
        self.color = color;
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        let (rx, ry) = self.radii();
        if rx < f64::EPSILON || ry < f64::EPSILON {
            // Flat box: fall back to the bounding test.
            return self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2;
        }
        let center = self.center();
        let dx = (f64::from(x) - center.x) / rx;
        let dy = (f64::from(y) - center.y) / ry;
        dx * dx + dy * dy <= 1.0
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
