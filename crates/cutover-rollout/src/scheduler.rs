//! Drain scheduler — delayed stop-then-remove of superseded replicas.
//!
//! `schedule_drain` registers the replica before it returns; the teardown
//! itself runs on its own task after the grace period. A failed stop or
//! remove is not retried. The replica is unregistered either way, so the
//! next join that still sees it will schedule it again.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use cutover_runtime::ContainerRuntime;

use crate::error::DrainError;
use crate::registry::{DrainRegistry, PendingDrain};

/// Result of asking for a replica to be drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A new teardown task was scheduled.
    Scheduled,
    /// A teardown for this replica is already pending; nothing changed.
    AlreadyPending,
}

/// Schedules teardown tasks and tracks them in a [`DrainRegistry`].
#[derive(Clone)]
pub struct DrainScheduler {
    runtime: Arc<dyn ContainerRuntime>,
    registry: DrainRegistry,
}

impl DrainScheduler {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, registry: DrainRegistry) -> Self {
        Self { runtime, registry }
    }

    pub fn registry(&self) -> &DrainRegistry {
        &self.registry
    }

    /// Stop and remove `replica_id` once `delay` has elapsed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_drain(&self, replica_id: &str, replica_name: &str, delay: Duration) -> DrainOutcome {
        let info = PendingDrain::new(replica_id, replica_name, delay);
        let runtime = Arc::clone(&self.runtime);
        let registry = self.registry.clone();
        let id = replica_id.to_string();
        let name = replica_name.to_string();

        let claimed = self.registry.claim(info, move |generation| {
            tokio::spawn(async move {
                run_drain(runtime, registry, id, name, delay, generation).await;
            })
        });

        if claimed {
            info!(
                replica = replica_name,
                id = replica_id,
                delay_secs = delay.as_secs(),
                "replica will be stopped after grace period"
            );
            DrainOutcome::Scheduled
        } else {
            debug!(replica = replica_name, id = replica_id, "drain already pending");
            DrainOutcome::AlreadyPending
        }
    }

    /// Abort all pending drains (process shutdown).
    pub fn shutdown(&self) -> usize {
        let aborted = self.registry.abort_all();
        if aborted > 0 {
            info!(count = aborted, "pending drains aborted");
        }
        aborted
    }
}

/// The body of one drain task.
async fn run_drain(
    runtime: Arc<dyn ContainerRuntime>,
    registry: DrainRegistry,
    id: String,
    name: String,
    delay: Duration,
    generation: u64,
) {
    tokio::time::sleep(delay).await;

    let result = teardown(runtime.as_ref(), &id).await;
    registry.release(&id, generation);

    match result {
        Ok(()) => info!(replica = %name, %id, "replica stopped and removed"),
        Err(e) => error!(replica = %name, %id, error = %e, "drain abandoned"),
    }
}

async fn teardown(runtime: &dyn ContainerRuntime, id: &str) -> Result<(), DrainError> {
    runtime.stop(id).await.map_err(DrainError::Stop)?;
    runtime.remove(id).await.map_err(DrainError::Remove)?;
    Ok(())
}
