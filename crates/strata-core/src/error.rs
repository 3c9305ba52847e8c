//! Error types for strata-core

use std::path::PathBuf;

use crate::codec::CodecError;

/// Result type for strata-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or writing configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration path failed validation
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A stored layer could not be decoded
    #[error("Failed to decode layer at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: CodecError,
    },

    /// A document could not be encoded back to text
    #[error("Failed to encode document: {0}")]
    Encode(#[source] CodecError),

    /// Filesystem error while importing layers
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Storage backend error
    #[error(transparent)]
    Store(#[from] strata_store::Error),
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
