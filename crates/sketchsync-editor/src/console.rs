//! Text rendering of the shared sketch.

use sketchsync_core::{Editor, ShapeId, Sketch};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// An editor that keeps the latest sketch and prints it on every repaint.
pub struct ConsoleEditor<W: Write + Send + 'static> {
    sketch: Arc<Mutex<Sketch>>,
    out: W,
}

impl<W: Write + Send + 'static> ConsoleEditor<W> {
    pub fn new(out: W) -> Self {
        Self {
            sketch: Arc::default(),
            out,
        }
    }

    /// Shared view of the latest sketch, for the input loop.
    pub fn view(&self) -> SketchView {
        SketchView(self.sketch.clone())
    }
}

impl<W: Write + Send + 'static> Editor for ConsoleEditor<W> {
    fn set_sketch(&mut self, sketch: Sketch) {
        if let Ok(mut current) = self.sketch.lock() {
            *current = sketch;
        }
    }

    fn repaint(&mut self) {
        let text = self.view().render();
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            log::warn!("could not print sketch: {}", e);
        }
    }
}

/// Read access to the sketch a [`ConsoleEditor`] last received.
#[derive(Clone)]
pub struct SketchView(Arc<Mutex<Sketch>>);

impl SketchView {
    pub fn render(&self) -> String {
        self.0.lock().map(|s| render(&s)).unwrap_or_default()
    }

    /// Topmost shape containing the point.
    pub fn shape_at(&self, x: i32, y: i32) -> Option<ShapeId> {
        self.0.lock().ok().and_then(|s| s.shape_at(x, y))
    }

    /// Describe the shape with `id`, if present.
    pub fn describe(&self, id: ShapeId) -> Option<String> {
        let sketch = self.0.lock().ok()?;
        sketch.get(id).map(|shape| shape.to_string())
    }
}

/// Human-readable listing of a sketch.
pub fn render(sketch: &Sketch) -> String {
    if sketch.is_empty() {
        return "-- sketch is empty --".to_string();
    }
    let mut out = format!("-- {} shape(s) --", sketch.len());
    for (id, shape) in sketch.iter() {
        let c = shape.color();
        let bounds = shape.bounds();
        out.push_str(&format!(
            "\n#{id:<4} {:<9} #{:02x}{:02x}{:02x}  [{}, {}]..[{}, {}]",
            shape.kind(),
            c.r,
            c.g,
            c.b,
            bounds.x0,
            bounds.y0,
            bounds.x1,
            bounds.y1,
        ));
    }
    out
}
