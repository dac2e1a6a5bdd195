//! Replica records as seen by the rest of the system.

use serde::{Deserialize, Serialize};

/// One running replica (container) of a service.
///
/// Built fresh from the runtime on every join and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    /// Runtime identifier (container ID).
    pub id: String,
    /// Human-readable name, without Docker's leading `/`.
    pub name: String,
    /// Creation time in Unix seconds; the ordering key.
    pub created_at: i64,
    /// Network address the proxy should send traffic to.
    pub address: String,
}

impl ReplicaRecord {
    pub fn new(id: &str, name: &str, created_at: i64, address: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            created_at,
            address: address.to_string(),
        }
    }
}
