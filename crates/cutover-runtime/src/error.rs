//! Error types for runtime queries and control calls.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while talking to the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("service label must not be empty")]
    EmptyLabel,

    #[error("failed to connect to runtime: {0}")]
    Connect(String),

    #[error("runtime request failed: {0}")]
    Http(String),

    #[error("runtime returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode runtime response: {0}")]
    Decode(String),
}
