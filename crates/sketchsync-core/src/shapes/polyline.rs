//! Freehand drawing shape.

use super::{Segment, ShapeColor, ShapeTrait};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// A freehand stroke made of connected segments ("joints").
///
/// Segments are stored newest first, which is also their wire order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polyline {
    segments: Vec<Segment>,
    color: ShapeColor,
    /// Start of the segment currently being drawn.
    #[serde(skip)]
    pending: Option<(i32, i32)>,
}

impl Polyline {
    /// Start a new stroke at a point.
    pub fn new(x: i32, y: i32, color: ShapeColor) -> Self {
        Self {
            segments: Vec::new(),
            color,
            pending: Some((x, y)),
        }
    }

    /// Rebuild a stroke from committed segments (newest first).
    ///
    /// Drawing continues from the end of the newest segment.
    pub fn from_segments(segments: Vec<Segment>, color: ShapeColor) -> Self {
        let pending = segments.first().map(|s| (s.x2, s.y2));
        let segments = segments
            .into_iter()
            .map(|s| Segment { color, ..s })
            .collect();
        Self {
            segments,
            color,
            pending,
        }
    }

    /// Close the in-progress segment at (x, y) and start the next one there.
    pub fn update(&mut self, x: i32, y: i32) {
        if let Some((sx, sy)) = self.pending {
            self.segments
                .insert(0, Segment::new(sx, sy, x, y, self.color));
        }
        self.pending = Some((x, y));
    }

    /// Committed segments, newest first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl PartialEq for Polyline {
    // The pending point is drawing state, not geometry.
    fn eq(&self, other: &Self) -> bool {
        self.color == other.color && self.segments == other.segments
    }
}

impl ShapeTrait for Polyline {
    const NAME: &'static str = "freehand";

    fn color(&self) -> ShapeColor {
        self.color
    }

    fn set_color(&mut self, color: ShapeColor) {
        self.color = color;
        for segment in &mut self.segments {
            segment.color = color;
        }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.segments.iter().any(|s| s.contains(x, y))
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        for segment in &mut self.segments {
            segment.move_by(dx, dy);
        }
        if let Some((px, py)) = self.pending.as_mut() {
            *px += dx;
            *py += dy;
        }
    }

    fn bounds(&self) -> Rect {
        self.segments
            .iter()
            .map(|s| s.bounds())
            .reduce(|acc, b| acc.union(b))
            .unwrap_or(Rect::ZERO)
    }

    fn params(&self) -> Vec<i32> {
        self.segments.iter().flat_map(|s| s.params()).collect()
    }
}
