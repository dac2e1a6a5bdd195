//! Drain registry — which replicas already have a teardown pending.
//!
//! Shared by every join request and every drain task. The check and the
//! insert happen under one lock ([`DrainRegistry::claim`]), so two
//! overlapping joins can never both schedule the same replica. Entries
//! carry a generation so a finishing task only removes its own entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::debug;

/// A scheduled teardown, as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PendingDrain {
    pub replica_id: String,
    pub replica_name: String,
    /// Unix seconds when the drain was scheduled.
    pub scheduled_at: u64,
    /// Unix seconds when stop/remove will start.
    pub due_at: u64,
}

impl PendingDrain {
    pub fn new(replica_id: &str, replica_name: &str, delay: Duration) -> Self {
        let now = epoch_secs();
        Self {
            replica_id: replica_id.to_string(),
            replica_name: replica_name.to_string(),
            scheduled_at: now,
            due_at: now.saturating_add(delay.as_secs()),
        }
    }
}

struct Slot {
    info: PendingDrain,
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    next_generation: u64,
}

/// Process-wide registry of pending drains. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct DrainRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl DrainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `replica_id` has a drain pending.
    pub fn is_pending(&self, replica_id: &str) -> bool {
        let inner = self.inner.lock().expect("drain registry lock");
        inner.slots.contains_key(replica_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("drain registry lock").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of pending drains, ordered by due time then replica id.
    pub fn pending(&self) -> Vec<PendingDrain> {
        let inner = self.inner.lock().expect("drain registry lock");
        let mut drains: Vec<PendingDrain> = inner.slots.values().map(|s| s.info.clone()).collect();
        drains.sort_by(|a, b| {
            a.due_at
                .cmp(&b.due_at)
                .then_with(|| a.replica_id.cmp(&b.replica_id))
        });
        drains
    }

    /// Register `info` unless its replica is already pending.
    ///
    /// On success `spawn` is called, still under the lock, with the entry's
    /// generation and must return the task that will later [`release`] it.
    /// Returns false (and never calls `spawn`) if a drain is already pending.
    ///
    /// [`release`]: DrainRegistry::release
    pub(crate) fn claim<F>(&self, info: PendingDrain, spawn: F) -> bool
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let mut inner = self.inner.lock().expect("drain registry lock");
        if inner.slots.contains_key(&info.replica_id) {
            return false;
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let handle = spawn(generation);
        inner.slots.insert(
            info.replica_id.clone(),
            Slot {
                info,
                generation,
                handle,
            },
        );
        true
    }

    /// Remove the entry for `replica_id` if it still belongs to `generation`.
    pub(crate) fn release(&self, replica_id: &str, generation: u64) -> bool {
        let mut inner = self.inner.lock().expect("drain registry lock");
        match inner.slots.get(replica_id) {
            Some(slot) if slot.generation == generation => {
                inner.slots.remove(replica_id);
                debug!(replica = replica_id, "drain unregistered");
                true
            }
            _ => false,
        }
    }

    /// Abort every pending drain task and clear the registry.
    ///
    /// Only used on process shutdown; returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let mut inner = self.inner.lock().expect("drain registry lock");
        let count = inner.slots.len();
        for (id, slot) in inner.slots.drain() {
            slot.handle.abort();
            debug!(replica = %id, "drain aborted");
        }
        count
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(std::future::pending::<()>())
    }

    #[tokio::test]
    async fn claim_is_exclusive_per_replica() {
        let registry = DrainRegistry::new();
        let first = registry.claim(PendingDrain::new("r2", "web-2", Duration::from_secs(60)), |_| idle_task());
        let mut spawned = false;
        let second = registry.claim(PendingDrain::new("r2", "web-2", Duration::from_secs(60)), |_| {
            spawned = true;
            idle_task()
        });

        assert!(first);
        assert!(!second);
        assert!(!spawned);
        assert!(registry.is_pending("r2"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn release_requires_matching_generation() {
        let registry = DrainRegistry::new();
        let mut generation = None;
        registry.claim(PendingDrain::new("r1", "web-1", Duration::ZERO), |g| {
            generation = Some(g);
            idle_task()
        });
        let generation = generation.unwrap();

        assert!(!registry.release("r1", generation + 1));
        assert!(registry.is_pending("r1"));
        assert!(registry.release("r1", generation));
        assert!(registry.is_empty());
        assert!(!registry.release("r1", generation));
    }

    #[tokio::test]
    async fn pending_is_sorted_by_due_time() {
        let registry = DrainRegistry::new();
        registry.claim(PendingDrain::new("late", "b", Duration::from_secs(600)), |_| idle_task());
        registry.claim(PendingDrain::new("soon", "a", Duration::from_secs(60)), |_| idle_task());

        let ids: Vec<String> = registry.pending().into_iter().map(|d| d.replica_id).collect();
        assert_eq!(ids, vec!["soon".to_string(), "late".to_string()]);
    }

    #[tokio::test]
    async fn abort_all_clears_registry() {
        let registry = DrainRegistry::new();
        registry.claim(PendingDrain::new("a", "a", Duration::from_secs(60)), |_| idle_task());
        registry.claim(PendingDrain::new("b", "b", Duration::from_secs(60)), |_| idle_task());

        assert_eq!(registry.abort_all(), 2);
        assert!(registry.is_empty());
    }
}
