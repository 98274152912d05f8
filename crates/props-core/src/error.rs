//! Error types for props-core

use crate::encoding::Encoding;
use crate::reader::{Position, State};

/// Result type for props-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing properties
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid unicode escape at {position}: expected a hex digit, found {found:?}")]
    InvalidUnicodeEscape { position: Position, found: char },

    #[error("Unpaired UTF-16 surrogate \\u{unit:04X} at {position}")]
    InvalidSurrogate { position: Position, unit: u16 },

    #[error("Unexpected end of input at {position} while in {state:?}")]
    UnexpectedEof { position: Position, state: State },

    #[error("Input at {position} is not valid {encoding}")]
    Decode {
        position: Position,
        encoding: Encoding,
    },

    #[error("Unsupported encoding: {label}")]
    UnsupportedEncoding { label: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error comes from malformed properties text rather than
    /// from the underlying stream.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUnicodeEscape { .. }
                | Self::InvalidSurrogate { .. }
                | Self::UnexpectedEof { .. }
                | Self::Decode { .. }
        )
    }

    /// Position of the offending character, for parse errors.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::InvalidUnicodeEscape { position, .. }
            | Self::InvalidSurrogate { position, .. }
            | Self::UnexpectedEof { position, .. }
            | Self::Decode { position, .. } => Some(*position),
            Self::UnsupportedEncoding { .. } | Self::Io(_) => None,
        }
    }
}
