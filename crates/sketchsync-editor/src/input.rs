//! Console input: local commands and protocol commands typed by the user.

use sketchsync_core::{Command, ProtocolError};
use thiserror::Error;

/// A help entry for one console command.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub usage: &'static str,
    pub description: &'static str,
}

impl HelpEntry {
    pub const fn new(usage: &'static str, description: &'static str) -> Self {
        Self { usage, description }
    }
}

/// Registry of everything the console understands.
pub struct HelpRegistry;

impl HelpRegistry {
    pub fn all() -> Vec<HelpEntry> {
        vec![
            HelpEntry::new("DRAW <shape>", "Add a shape, e.g. DRAW rectangle 0 0 40 20 -65536"),
            HelpEntry::new("MOVE <id> <shape>", "Replace shape <id> with <shape>"),
            HelpEntry::new("RECOLOR <id> <color>", "Change the color of shape <id>"),
            HelpEntry::new("DELETE <id>", "Remove shape <id>"),
            HelpEntry::new("list", "Print the current sketch"),
            HelpEntry::new("at <x> <y>", "Show the topmost shape containing a point"),
            HelpEntry::new("help", "Show this help"),
            HelpEntry::new("quit", "Disconnect and exit"),
        ]
    }

    /// Help text, one entry per line.
    pub fn render() -> String {
        let mut out = String::from("Commands:\n");
        for entry in Self::all() {
            out.push_str(&format!("  {:22} {}\n", entry.usage, entry.description));
        }
        out.push_str("Shapes: segment|rectangle|ellipse x1 y1 x2 y2 color, freehand (x1 y1 x2 y2)+ color\n");
        out.push_str("Colors are packed 0xAARRGGBB integers: black -16777216, red -65536, blue -16776961");
        out
    }
}

/// Errors from parsing a console line.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("usage: at <x> <y>")]
    BadPoint,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Help,
    List,
    At { x: i32, y: i32 },
    Quit,
    Send(Command),
}

impl Input {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, InputError> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(None);
        };

        let input = match first.to_ascii_lowercase().as_str() {
            "help" | "?" => Input::Help,
            "list" | "ls" => Input::List,
            "quit" | "exit" => Input::Quit,
            "at" => {
                let mut coord = || words.next().and_then(|w| w.parse::<i32>().ok());
                match (coord(), coord()) {
                    (Some(x), Some(y)) => Input::At { x, y },
                    _ => return Err(InputError::BadPoint),
                }
            }
            _ => Input::Send(Command::parse_inline(line)?),
        };
        Ok(Some(input))
    }
}
