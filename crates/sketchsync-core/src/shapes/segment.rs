//! Straight line segment.

use super::{ShapeColor, ShapeTrait, point_to_segment_dist};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Hit tolerance (in pixels) around a segment.
pub const SEGMENT_TOLERANCE: f64 = 3.0;

/// A line segment from (x1, y1) to (x2, y2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub color: ShapeColor,
}

impl Segment {
    /// Create a new segment.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, color: ShapeColor) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            color,
        }
    }

    /// Zero-length segment anchored at a point, as started by a mouse press.
    pub fn at(x: i32, y: i32, color: ShapeColor) -> Self {
        Self::new(x, y, x, y, color)
    }

    /// Move the end point, keeping the start.
    pub fn set_end(&mut self, x: i32, y: i32) {
        self.x2 = x;
        self.y2 = y;
    }

    pub fn start(&self) -> Point {
        Point::new(f64::from(self.x1), f64::from(self.y1))
    }

    pub fn end(&self) -> Point {
        Point::new(f64::from(self.x2), f64::from(self.y2))
    }
}

impl ShapeTrait for Segment {
    const NAME: &'static str = "segment";

    fn color(&self) -> ShapeColor {
        self.color
    }

    fn set_color(&mut self, color: ShapeColor) {
        self.color = color;
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        let point = Point::new(f64::from(x), f64::from(y));
        point_to_segment_dist(point, self.start(), self.end()) <= SEGMENT_TOLERANCE
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        self.x1 += dx;
        self.y1 += dy;
        self.x2 += dx;
        self.y2 += dy;
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start(), self.end())
    }

    fn params(&self) -> Vec<i32> {
        vec![self.x1, self.y1, self.x2, self.y2]
    }
}
