//! SketchSync console editor
//!
//! A headless editor: prints every sketch the server sends and forwards
//! commands typed on stdin.

mod console;
mod input;

pub use console::{ConsoleEditor, SketchView, render};
pub use input::{HelpEntry, HelpRegistry, Input, InputError};
