//! The sketch: every shape on the shared canvas, keyed by ID.

use crate::shapes::{Shape, ShapeParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier assigned to a shape by the server.
pub type ShapeId = u32;

/// First line of a serialized sketch.
pub const SKETCH_HEADER: &str = "Shapes are:";

/// Last line of a serialized sketch.
pub const SKETCH_TERMINATOR: &str = "end";

/// Errors from decoding a whole sketch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    #[error("sketch does not start with the \"Shapes are:\" header")]
    MissingHeader,
    #[error("sketch is not terminated by \"end\"")]
    MissingTerminator,
    #[error("invalid shape id: {0}")]
    InvalidId(String),
    #[error("entry has no tab separator: {0}")]
    MissingSeparator(String),
    #[error(transparent)]
    Shape(#[from] ShapeParseError),
}

/// All shapes of a drawing, ordered by ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    shapes: BTreeMap<ShapeId, Shape>,
}

impl Sketch {
    /// Create a new empty sketch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a shape line and insert it at `id`, replacing any previous shape.
    ///
    /// A malformed line leaves the sketch unchanged.
    pub fn add(&mut self, id: ShapeId, line: &str) -> Result<(), ShapeParseError> {
        match line.parse::<Shape>() {
            Ok(shape) => {
                self.shapes.insert(id, shape);
                Ok(())
            }
            Err(e) => {
                log::warn!("Dropping malformed shape {} ({}): {:?}", id, e, line);
                Err(e)
            }
        }
    }

    /// Insert a shape at `id`, returning the shape it replaced.
    pub fn insert(&mut self, id: ShapeId, shape: Shape) -> Option<Shape> {
        self.shapes.insert(id, shape)
    }

    /// Remove a shape. Removing an absent ID is a no-op.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        self.shapes.remove(&id)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn contains_id(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Copy every entry of `other` into this sketch. Entries from `other`
    /// win on ID collision.
    pub fn merge(&mut self, other: Sketch) {
        self.shapes.extend(other.shapes);
    }

    /// Iterate shapes in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes.iter().map(|(id, shape)| (*id, shape))
    }

    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shapes.keys().copied()
    }

    /// Topmost (most recently created) shape containing the point.
    pub fn shape_at(&self, x: i32, y: i32) -> Option<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .find(|(_, shape)| shape.contains(x, y))
            .map(|(id, _)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Canonical multi-line form: header, `<id>\t<shape>` lines, terminator.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Parse the canonical form produced by [`Sketch::serialize`].
    ///
    /// Malformed entry lines are logged and skipped so a single corrupt
    /// record cannot discard the rest of the sketch.
    pub fn deserialize(text: &str) -> Result<Self, SketchError> {
        let mut lines = text.lines();
        match lines.next() {
            Some(line) if line.trim_end() == SKETCH_HEADER => {}
            _ => return Err(SketchError::MissingHeader),
        }

        let mut sketch = Sketch::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line == SKETCH_TERMINATOR {
                return Ok(sketch);
            }
            match parse_entry(line) {
                Ok((id, shape)) => {
                    sketch.shapes.insert(id, shape);
                }
                Err(e) => log::warn!("Skipping sketch entry ({}): {:?}", e, line),
            }
        }
        Err(SketchError::MissingTerminator)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Import from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Parse one `<id>\t<shape>` line.
fn parse_entry(line: &str) -> Result<(ShapeId, Shape), SketchError> {
    let (id, shape) = line
        .split_once('\t')
        .ok_or_else(|| SketchError::MissingSeparator(line.to_string()))?;
    let id = id
        .trim()
        .parse::<ShapeId>()
        .map_err(|_| SketchError::InvalidId(id.to_string()))?;
    Ok((id, shape.parse()?))
}

impl fmt::Display for Sketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{SKETCH_HEADER}")?;
        for (id, shape) in &self.shapes {
            writeln!(f, "{id}\t{shape}")?;
        }
        f.write_str(SKETCH_TERMINATOR)
    }
}

impl FromIterator<(ShapeId, Shape)> for Sketch {
    fn from_iter<I: IntoIterator<Item = (ShapeId, Shape)>>(iter: I) -> Self {
        Self {
            shapes: iter.into_iter().collect(),
        }
    }
}

/// Rebuilds sketches from a stream of lines.
///
/// Lines outside a header/terminator pair are ignored.
#[derive(Debug, Default)]
pub struct SketchAssembler {
    buffer: Option<Vec<String>>,
}

impl SketchAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the sketch once its terminator arrives.
    pub fn push_line(&mut self, line: &str) -> Option<Result<Sketch, SketchError>> {
        let line = line.trim_end_matches(['\r', '\n']);
        match self.buffer.as_mut() {
            None => {
                if line == SKETCH_HEADER {
                    self.buffer = Some(vec![line.to_string()]);
                } else {
                    log::debug!("Ignoring line outside of a sketch: {:?}", line);
                }
                None
            }
            Some(buffer) => {
                buffer.push(line.to_string());
                if line != SKETCH_TERMINATOR {
                    return None;
                }
                let text = self.buffer.take().unwrap_or_default().join("\n");
                Some(Sketch::deserialize(&text))
            }
        }
    }

    /// Whether a sketch is partially received.
    pub fn in_progress(&self) -> bool {
        self.buffer.is_some()
    }
}
