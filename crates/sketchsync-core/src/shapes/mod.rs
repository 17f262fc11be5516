//! Shape definitions for the shared sketch.
//!
//! Every shape has a canonical one-line text form, for example
//! `segment 0 0 10 10 -16776961`: the variant name, its integer geometry and
//! finally the packed color. That form is what travels over the wire.

mod ellipse;
mod polyline;
mod rectangle;
mod segment;

pub use ellipse::Ellipse;
pub use polyline::Polyline;
pub use rectangle::Rectangle;
pub use segment::{SEGMENT_TOLERANCE, Segment};

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Shape color (RGB8).
///
/// On the wire a color is a signed 32-bit `0xAARRGGBB` integer. Alpha is
/// always written as opaque and ignored when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ShapeColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub const fn red() -> Self {
        Self::new(255, 0, 0)
    }

    pub const fn blue() -> Self {
        Self::new(0, 0, 255)
    }

    /// Decode a packed wire color. The alpha byte is discarded.
    pub fn from_packed(packed: i32) -> Self {
        let bits = packed as u32;
        Self {
            r: (bits >> 16) as u8,
            g: (bits >> 8) as u8,
            b: bits as u8,
        }
    }

    /// Encode as a packed wire color with an opaque alpha byte.
    pub fn to_packed(self) -> i32 {
        let bits = 0xFF00_0000u32
            | (u32::from(self.r) << 16)
            | (u32::from(self.g) << 8)
            | u32::from(self.b);
        bits as i32
    }
}

impl Default for ShapeColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Errors produced while decoding a shape line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeParseError {
    #[error("empty shape line")]
    Empty,
    #[error("unknown shape variant: {0}")]
    UnknownVariant(String),
    #[error("{variant} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        variant: &'static str,
        expected: &'static str,
        actual: usize,
    },
    #[error("not an integer: {0}")]
    NotAnInteger(String),
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Common behaviour of every shape variant.
pub trait ShapeTrait {
    /// The canonical variant token (first word of the text form).
    const NAME: &'static str;

    fn color(&self) -> ShapeColor;

    fn set_color(&mut self, color: ShapeColor);

    /// Check if the point hits this shape.
    fn contains(&self, x: i32, y: i32) -> bool;

    /// Translate all geometry by the given offset.
    fn move_by(&mut self, dx: i32, dy: i32);

    /// Inclusive bounding box.
    fn bounds(&self) -> Rect;

    /// Geometry parameters in wire order, excluding the color.
    fn params(&self) -> Vec<i32>;
}

/// Enum wrapper for all shape types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Segment(Segment),
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Polyline(Polyline),
}

impl Shape {
    /// The variant token used in the text form.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Segment(_) => Segment::NAME,
            Shape::Rectangle(_) => Rectangle::NAME,
            Shape::Ellipse(_) => Ellipse::NAME,
            Shape::Polyline(_) => Polyline::NAME,
        }
    }

    pub fn color(&self) -> ShapeColor {
        match self {
            Shape::Segment(s) => s.color(),
            Shape::Rectangle(s) => s.color(),
            Shape::Ellipse(s) => s.color(),
            Shape::Polyline(s) => s.color(),
        }
    }

    pub fn set_color(&mut self, color: ShapeColor) {
        match self {
            Shape::Segment(s) => s.set_color(color),
            Shape::Rectangle(s) => s.set_color(color),
            Shape::Ellipse(s) => s.set_color(color),
            Shape::Polyline(s) => s.set_color(color),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        match self {
            Shape::Segment(s) => s.contains(x, y),
            Shape::Rectangle(s) => s.contains(x, y),
            Shape::Ellipse(s) => s.contains(x, y),
            Shape::Polyline(s) => s.contains(x, y),
        }
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        match self {
            Shape::Segment(s) => s.move_by(dx, dy),
            Shape::Rectangle(s) => s.move_by(dx, dy),
            Shape::Ellipse(s) => s.move_by(dx, dy),
            Shape::Polyline(s) => s.move_by(dx, dy),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Segment(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Polyline(s) => s.bounds(),
        }
    }

    fn params(&self) -> Vec<i32> {
        match self {
            Shape::Segment(s) => s.params(),
            Shape::Rectangle(s) => s.params(),
            Shape::Ellipse(s) => s.params(),
            Shape::Polyline(s) => s.params(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())?;
        for value in self.params() {
            write!(f, " {value}")?;
        }
        write!(f, " {}", self.color().to_packed())
    }
}

impl FromStr for Shape {
    type Err = ShapeParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let variant = tokens.next().ok_or(ShapeParseError::Empty)?;
        let mut args = tokens
            .map(|t| {
                t.parse::<i32>()
                    .map_err(|_| ShapeParseError::NotAnInteger(t.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match variant {
            Segment::NAME => {
                let [x1, y1, x2, y2, color] = corners(Segment::NAME, &args)?;
                Ok(Shape::Segment(Segment::new(
                    x1,
                    y1,
                    x2,
                    y2,
                    ShapeColor::from_packed(color),
                )))
            }
            Rectangle::NAME => {
                let [x1, y1, x2, y2, color] = corners(Rectangle::NAME, &args)?;
                Ok(Shape::Rectangle(Rectangle::new(
                    x1,
                    y1,
                    x2,
                    y2,
                    ShapeColor::from_packed(color),
                )))
            }
            Ellipse::NAME => {
                let [x1, y1, x2, y2, color] = corners(Ellipse::NAME, &args)?;
                Ok(Shape::Ellipse(Ellipse::new(
                    x1,
                    y1,
                    x2,
                    y2,
                    ShapeColor::from_packed(color),
                )))
            }
            Polyline::NAME => {
                let count = args.len();
                if count == 0 || (count - 1) % 4 != 0 {
                    return Err(ShapeParseError::ArgumentCount {
                        variant: Polyline::NAME,
                        expected: "4n+1",
                        actual: count,
                    });
                }
                let color = ShapeColor::from_packed(args.pop().unwrap_or_default());
                let segments = args
                    .chunks_exact(4)
                    .map(|c| Segment::new(c[0], c[1], c[2], c[3], color))
                    .collect();
                Ok(Shape::Polyline(Polyline::from_segments(segments, color)))
            }
            other => Err(ShapeParseError::UnknownVariant(other.to_string())),
        }
    }
}

/// Split the five arguments shared by the two-corner shapes.
fn corners(variant: &'static str, args: &[i32]) -> Result<[i32; 5], ShapeParseError> {
    <[i32; 5]>::try_from(args).map_err(|_| ShapeParseError::ArgumentCount {
        variant,
        expected: "5",
        actual: args.len(),
    })
}

impl From<Segment> for Shape {
    fn from(s: Segment) -> Self {
        Shape::Segment(s)
    }
}

impl From<Rectangle> for Shape {
    fn from(s: Rectangle) -> Self {
        Shape::Rectangle(s)
    }
}

impl From<Ellipse> for Shape {
    fn from(s: Ellipse) -> Self {
        Shape::Ellipse(s)
    }
}

impl From<Polyline> for Shape {
    fn from(s: Polyline) -> Self {
        Shape::Polyline(s)
    }
}
