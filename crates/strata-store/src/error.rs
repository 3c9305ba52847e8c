//! Error types for strata-store

use std::path::PathBuf;

/// Result type for strata-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in strata-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed stored key {key:?}: {message}")]
    MalformedKey { key: String, message: String },

    #[error("Invalid key pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid {kind} backend configuration: {message}")]
    InvalidBackend { kind: String, message: String },

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

    pub fn malformed_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.into(),
            message: message.into(),
        }
    }
}
