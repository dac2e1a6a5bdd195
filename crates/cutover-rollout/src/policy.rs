//! Weight assignment — the newest replica takes all traffic.

use cutover_runtime::ReplicaRecord;
use cutover_topology::Endpoint;

use crate::registry::DrainRegistry;

/// Weight of the replica receiving traffic.
pub const ACTIVE_WEIGHT: u32 = 100;
/// Weight of replicas that are draining.
pub const DRAINING_WEIGHT: u32 = 0;

/// Outcome of the policy for one join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// One endpoint per replica, in discovery order (newest first).
    pub endpoints: Vec<Endpoint>,
    /// Replicas at weight 0 that have no drain pending yet.
    pub superseded: Vec<ReplicaRecord>,
}

/// Assign weights to `replicas`, which must be sorted newest first.
///
/// Index 0 is active; every other replica drains. A draining replica is
/// newly superseded unless `registry` already has a drain pending for it.
/// The scheduler re-checks this atomically when it claims the replica.
pub fn assign_weights(replicas: &[ReplicaRecord], port: &str, registry: &DrainRegistry) -> Assignment {
    let mut endpoints = Vec::with_capacity(replicas.len());
    let mut superseded = Vec::new();

    for (index, replica) in replicas.iter().enumerate() {
        let weight = if index == 0 {
            ACTIVE_WEIGHT
        } else {
            if !registry.is_pending(&replica.id) {
                superseded.push(replica.clone());
            }
            DRAINING_WEIGHT
        };
        endpoints.push(Endpoint {
            url: endpoint_url(&replica.address, port),
            weight,
        });
    }

    Assignment {
        endpoints,
        superseded,
    }
}

/// `http://address:port`, bracketing IPv6 literals.
pub fn endpoint_url(address: &str, port: &str) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("http://[{address}]:{port}")
    } else {
        format!("http://{address}:{port}")
    }
}
