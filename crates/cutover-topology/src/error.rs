//! Error types for the topology store.

use thiserror::Error;

/// Result type alias for topology store operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while reading or writing routing documents.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("malformed routing document {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("failed to serialize routing document: {0}")]
    Serialize(String),

    #[error("failed to write {path}: {reason}")]
    Persist { path: String, reason: String },
}
