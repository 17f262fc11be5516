//! SketchSync Core Library
//!
//! Shape model, sketch, line protocol and the editor-side communicator for
//! the SketchSync collaborative drawing server.

pub mod editor;
pub mod protocol;
pub mod shapes;
pub mod sketch;

pub use editor::{ConnectionState, Editor, EditorCommunicator, EditorError};
pub use protocol::{Command, DEFAULT_PORT, ProtocolError, Verb};
pub use shapes::{
    Ellipse, Polyline, Rectangle, Segment, Shape, ShapeColor, ShapeParseError, ShapeTrait,
};
pub use sketch::{SKETCH_HEADER, SKETCH_TERMINATOR, ShapeId, Sketch, SketchAssembler, SketchError};
