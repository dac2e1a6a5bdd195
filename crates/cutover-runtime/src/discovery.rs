//! Replica discovery — list a service's replicas, newest first.

use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::ReplicaRecord;
use crate::ContainerRuntime;

/// Discover all running replicas tagged with `label`.
///
/// The result is sorted by creation time, newest first. Replicas created
/// in the same second are ordered by identifier so the outcome is stable.
/// An empty vector means nothing matched; callers decide how to report it.
pub async fn discover(
    runtime: &dyn ContainerRuntime,
    label: &str,
) -> RuntimeResult<Vec<ReplicaRecord>> {
    if label.is_empty() {
        return Err(RuntimeError::EmptyLabel);
    }

    let mut replicas = runtime.list_by_label(label).await?;
    sort_newest_first(&mut replicas);

    debug!(
        label,
        count = replicas.len(),
        newest = replicas.first().map(|r| r.name.as_str()).unwrap_or(""),
        "discovered replicas"
    );

    Ok(replicas)
}

/// Sort replicas by creation time descending, then by id.
pub fn sort_newest_first(replicas: &mut [ReplicaRecord]) {
    replicas.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
