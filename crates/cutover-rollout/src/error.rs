//! Join and drain error types.

use thiserror::Error;

use cutover_runtime::RuntimeError;
use cutover_topology::TopologyError;

/// Errors that end a join request.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("{0}")]
    Validation(String),

    #[error("no running replicas for service {0}")]
    NotFound(String),

    #[error("replica discovery failed: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
}

pub type JoinResult<T> = Result<T, JoinError>;

/// Errors from a single drain attempt. Reported through logs only.
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("failed to stop replica: {0}")]
    Stop(RuntimeError),

    #[error("failed to remove replica: {0}")]
    Remove(RuntimeError),
}
