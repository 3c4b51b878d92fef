//! Error types for sentient-core operations.
//!
//! Hook operations never surface these to the host. They are converted into the
//! degraded outputs (`tracked: false`, `false` from a save, an empty default)
//! at the operation boundary and logged.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SentientError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to move temp file into place: {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path has no parent directory: {0}")]
    NoParent(PathBuf),
}

impl SentientError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SentientError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        SentientError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using SentientError.
pub type Result<T> = std::result::Result<T, SentientError>;
