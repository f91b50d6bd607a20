use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::grid::Pos;

/// A message of the replay protocol
///
/// Movement coordinates travel column first: `M {col} {row}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// `R?` - server asks whether the client is ready
    Query,
    /// `R` - client is ready
    Ready,
    /// `M {col} {row}` - move the agent to a cell
    Move { col: usize, row: usize },
    /// `E` - no more moves
    End,
}

impl Message {
    /// A movement to the `(row, column)` position `pos`
    pub fn movement((row, col): Pos) -> Self {
        Self::Move { col, row }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Query => f.write_str("R?"),
            Message::Ready => f.write_str("R"),
            Message::Move { col, row } => write!(f, "M {col} {row}"),
            Message::End => f.write_str("E"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed replay message {0:?}")]
pub struct ParseMessageError(pub String);

impl FromStr for Message {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseMessageError(s.to_string());
        match s {
            "R?" => Ok(Message::Query),
            "R" => Ok(Message::Ready),
            "E" => Ok(Message::End),
            _ => {
                let mut parts = s.split(' ');
                if parts.next() != Some("M") {
                    return Err(malformed());
                }
                let mut coord = || {
                    parts
                        .next()
                        .and_then(|p| p.parse::<usize>().ok())
                        .ok_or_else(malformed)
                };
                let (col, row) = (coord()?, coord()?);
                match parts.next() {
                    None => Ok(Message::Move { col, row }),
                    Some(_) => Err(malformed()),
                }
            }
        }
    }
}

/// How messages are delimited on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// No delimiter; boundaries are implied by individual sends and the pacing delay
    #[default]
    Raw,
    /// Every message is followed by `\n`
    Newline,
}

impl Framing {
    /// Bytes to put on the wire for `message`
    pub fn encode(self, message: &Message) -> Vec<u8> {
        let mut bytes = message.to_string().into_bytes();
        if self == Framing::Newline {
            bytes.push(b'\n');
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_swaps_coordinates() {
        let msg = Message::movement((21, 18));
        assert_eq!(msg, Message::Move { col: 18, row: 21 });
        assert_eq!(msg.to_string(), "M 18 21");
    }

    #[test]
    fn parses_protocol_messages() {
        assert_eq!("R?".parse::<Message>(), Ok(Message::Query));
        assert_eq!("R".parse::<Message>(), Ok(Message::Ready));
        assert_eq!("E".parse::<Message>(), Ok(Message::End));
        assert_eq!(
            "M 6 0".parse::<Message>(),
            Ok(Message::Move { col: 6, row: 0 })
        );
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "X", "r", "M", "M 1", "M 1 2 3", "M -1 2", "M a b", "R ?"] {
            assert!(bad.parse::<Message>().is_err(), "{bad:?} rejected");
        }
    }

    #[test]
    fn framing_appends_delimiter() {
        assert_eq!(Framing::Raw.encode(&Message::End), b"E");
        assert_eq!(
            Framing::Newline.encode(&Message::movement((2, 3))),
            b"M 3 2\n"
        );
    }
}
