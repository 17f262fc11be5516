//! Line protocol between editors and the sketch server.
//!
//! Every client command is two newline-terminated lines: a verb, then a
//! payload.
//!
//! ```text
//! DRAW      <shape>
//! MOVE      <id> <shape>
//! RECOLOR   <id> <packed-color>
//! DELETE    <id>
//! ```
//!
//! The server answers every accepted command (and every new connection) with
//! the whole sketch in its serialized form.

use crate::shapes::{Shape, ShapeColor, ShapeParseError};
use crate::sketch::ShapeId;
use std::fmt;
use thiserror::Error;

/// Default TCP port of the sketch server.
pub const DEFAULT_PORT: u16 = 4242;

/// Command verbs.
pub const VERB_DRAW: &str = "DRAW";
pub const VERB_MOVE: &str = "MOVE";
pub const VERB_RECOLOR: &str = "RECOLOR";
pub const VERB_DELETE: &str = "DELETE";

/// Errors from decoding a client command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown command verb: {0}")]
    UnknownVerb(String),
    #[error("missing shape id")]
    MissingId,
    #[error("invalid shape id: {0}")]
    InvalidId(String),
    #[error("missing color")]
    MissingColor,
    #[error("invalid color: {0}")]
    InvalidColor(String),
    #[error("unexpected trailing data: {0}")]
    TrailingData(String),
    #[error(transparent)]
    Shape(#[from] ShapeParseError),
}

/// Verb of a client command, known before its payload line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Draw,
    Move,
    Recolor,
    Delete,
}

impl Verb {
    /// Parse a verb line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        match line.trim() {
            VERB_DRAW => Ok(Verb::Draw),
            VERB_MOVE => Ok(Verb::Move),
            VERB_RECOLOR => Ok(Verb::Recolor),
            VERB_DELETE => Ok(Verb::Delete),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Draw => VERB_DRAW,
            Verb::Move => VERB_MOVE,
            Verb::Recolor => VERB_RECOLOR,
            Verb::Delete => VERB_DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a new shape; the server picks its ID.
    Draw(Shape),
    /// Replace the shape at `id` wholesale.
    Move { id: ShapeId, shape: Shape },
    /// Change only the color of the shape at `id`.
    Recolor { id: ShapeId, color: ShapeColor },
    /// Remove the shape at `id`.
    Delete { id: ShapeId },
}

impl Command {
    /// Decode the payload line that follows `verb`.
    pub fn decode(verb: Verb, payload: &str) -> Result<Self, ProtocolError> {
        let payload = payload.trim();
        match verb {
            Verb::Draw => Ok(Command::Draw(payload.parse()?)),
            Verb::Move => {
                let (id, rest) = split_id(payload)?;
                Ok(Command::Move {
                    id,
                    shape: rest.parse()?,
                })
            }
            Verb::Recolor => {
                let (id, rest) = split_id(payload)?;
                let mut tokens = rest.split_whitespace();
                let token = tokens.next().ok_or(ProtocolError::MissingColor)?;
                let packed = token
                    .parse::<i32>()
                    .map_err(|_| ProtocolError::InvalidColor(token.to_string()))?;
                if let Some(extra) = tokens.next() {
                    return Err(ProtocolError::TrailingData(extra.to_string()));
                }
                Ok(Command::Recolor {
                    id,
                    color: ShapeColor::from_packed(packed),
                })
            }
            Verb::Delete => {
                let (id, rest) = split_id(payload)?;
                if !rest.is_empty() {
                    return Err(ProtocolError::TrailingData(rest.to_string()));
                }
                Ok(Command::Delete { id })
            }
        }
    }

    /// Decode a command written on a single line, e.g. `DELETE 4`.
    pub fn parse_inline(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        let (verb, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        Self::decode(Verb::parse(verb)?, payload)
    }

    pub fn verb(&self) -> Verb {
        match self {
            Command::Draw(_) => Verb::Draw,
            Command::Move { .. } => Verb::Move,
            Command::Recolor { .. } => Verb::Recolor,
            Command::Delete { .. } => Verb::Delete,
        }
    }

    /// The payload line, without the verb.
    pub fn payload(&self) -> String {
        match self {
            Command::Draw(shape) => shape.to_string(),
            Command::Move { id, shape } => format!("{id} {shape}"),
            Command::Recolor { id, color } => format!("{id} {}", color.to_packed()),
            Command::Delete { id } => id.to_string(),
        }
    }

    /// Wire form: verb line and payload line, newline separated.
    pub fn encode(&self) -> String {
        format!("{}\n{}", self.verb(), self.payload())
    }
}

fn split_id(payload: &str) -> Result<(ShapeId, &str), ProtocolError> {
    let (token, rest) = payload
        .split_once(char::is_whitespace)
        .unwrap_or((payload, ""));
    if token.is_empty() {
        return Err(ProtocolError::MissingId);
    }
    let id = token
        .parse::<ShapeId>()
        .map_err(|_| ProtocolError::InvalidId(token.to_string()))?;
    Ok((id, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Segment};

    #[test]
    fn test_verb_parse() {
        assert_eq!(Verb::parse("DRAW"), Ok(Verb::Draw));
        assert_eq!(Verb::parse(" DELETE \r"), Ok(Verb::Delete));
        assert_eq!(
            Verb::parse("draw"),
            Err(ProtocolError::UnknownVerb("draw".to_string()))
        );
    }

    #[test]
    fn test_decode_each_verb() {
        assert_eq!(
            Command::decode(Verb::Draw, "segment 0 0 10 10 -16776961"),
            Ok(Command::Draw(Segment::new(0, 0, 10, 10, ShapeColor::blue()).into()))
        );
        assert_eq!(
            Command::decode(Verb::Move, "3 rectangle 5 5 1 1 -65536"),
            Ok(Command::Move {
                id: 3,
                shape: Rectangle::new(1, 1, 5, 5, ShapeColor::red()).into(),
            })
        );
        assert_eq!(
            Command::decode(Verb::Recolor, "7 -65536"),
            Ok(Command::Recolor {
                id: 7,
                color: ShapeColor::red(),
            })
        );
        assert_eq!(
            Command::decode(Verb::Delete, "12"),
            Ok(Command::Delete { id: 12 })
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Command::decode(Verb::Delete, ""), Err(ProtocolError::MissingId));
        assert_eq!(
            Command::decode(Verb::Delete, "-1"),
            Err(ProtocolError::InvalidId("-1".to_string()))
        );
        assert_eq!(
            Command::decode(Verb::Delete, "4 5"),
            Err(ProtocolError::TrailingData("5".to_string()))
        );
        assert_eq!(
            Command::decode(Verb::Recolor, "4"),
            Err(ProtocolError::MissingColor)
        );
        assert_eq!(
            Command::decode(Verb::Recolor, "4 red"),
            Err(ProtocolError::InvalidColor("red".to_string()))
        );
        assert!(matches!(
            Command::decode(Verb::Move, "4 circle 1 2 3"),
            Err(ProtocolError::Shape(ShapeParseError::UnknownVariant(_)))
        ));
        assert!(matches!(
            Command::decode(Verb::Draw, ""),
            Err(ProtocolError::Shape(ShapeParseError::Empty))
        ));
    }

    #[test]
    fn test_encode() {
        let cmd = Command::Recolor {
            id: 2,
            color: ShapeColor::blue(),
        };
        assert_eq!(cmd.encode(), "RECOLOR\n2 -16776961");

        let cmd = Command::Move {
            id: 9,
            shape: Segment::new(1, 2, 3, 4, ShapeColor::black()).into(),
        };
        assert_eq!(cmd.encode(), "MOVE\n9 segment 1 2 3 4 -16777216");
    }

    #[test]
    fn test_parse_inline() {
        assert_eq!(
            Command::parse_inline("DELETE 4"),
            Ok(Command::Delete { id: 4 })
        );
        assert_eq!(
            Command::parse_inline("DRAW ellipse 0 0 4 4 -16776961").map(|c| c.verb()),
            Ok(Verb::Draw)
        );
        assert!(matches!(
            Command::parse_inline("UNDO"),
            Err(ProtocolError::UnknownVerb(_))
        ));
    }
}
