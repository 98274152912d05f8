//! Error types for props-fs

use std::path::PathBuf;

/// Result type for props-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or saving properties files
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse properties at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: props_core::Error,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a core error, keeping I/O failures as [`Error::Io`].
    pub fn from_core(path: impl Into<PathBuf>, source: props_core::Error) -> Self {
        match source {
            props_core::Error::Io(source) => Self::io(path, source),
            source => Self::Parse {
                path: path.into(),
                source,
            },
        }
    }

    /// True when the file was readable but its content was malformed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { source, .. } if source.is_parse_error())
    }
}
