//! In-memory container runtime.
//!
//! Keeps replicas in a process-local table and records every stop/remove
//! call. Failures can be injected per operation, which is how the drain
//! and join tests exercise their error paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::ReplicaRecord;
use crate::{ContainerRuntime, RuntimeFuture};

struct Container {
    label: String,
    record: ReplicaRecord,
    running: bool,
}

#[derive(Default)]
struct Table {
    containers: BTreeMap<String, Container>,
    fail_list: Option<String>,
    fail_stop: HashSet<String>,
    fail_remove: HashSet<String>,
    stopped: Vec<String>,
    removed: Vec<String>,
}

/// Process-local [`ContainerRuntime`]. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryRuntime {
    table: Arc<Mutex<Table>>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running replica under `label`, replacing any with the same id.
    pub fn add(&self, label: &str, record: ReplicaRecord) {
        let mut table = self.table.lock().expect("memory runtime lock");
        table.containers.insert(
            record.id.clone(),
            Container {
                label: label.to_string(),
                record,
                running: true,
            },
        );
    }

    /// Make the next `list_by_label` call fail with `message`.
    pub fn fail_next_list(&self, message: &str) {
        let mut table = self.table.lock().expect("memory runtime lock");
        table.fail_list = Some(message.to_string());
    }

    /// Make every `stop` of `id` fail until cleared.
    pub fn fail_stop(&self, id: &str) {
        let mut table = self.table.lock().expect("memory runtime lock");
        table.fail_stop.insert(id.to_string());
    }

    /// Make every `remove` of `id` fail until cleared.
    pub fn fail_remove(&self, id: &str) {
        let mut table = self.table.lock().expect("memory runtime lock");
        table.fail_remove.insert(id.to_string());
    }

    /// Clear all injected stop/remove failures.
    pub fn clear_failures(&self) {
        let mut table = self.table.lock().expect("memory runtime lock");
        table.fail_list = None;
        table.fail_stop.clear();
        table.fail_remove.clear();
    }

    /// Identifiers passed to successful `stop` calls, in call order.
    pub fn stopped(&self) -> Vec<String> {
        self.table.lock().expect("memory runtime lock").stopped.clone()
    }

    /// Identifiers passed to successful `remove` calls, in call order.
    pub fn removed(&self) -> Vec<String> {
        self.table.lock().expect("memory runtime lock").removed.clone()
    }

    /// Whether a replica with `id` is still present (running or stopped).
    pub fn contains(&self, id: &str) -> bool {
        self.table
            .lock()
            .expect("memory runtime lock")
            .containers
            .contains_key(id)
    }

    fn list_sync(&self, label: &str) -> RuntimeResult<Vec<ReplicaRecord>> {
        let mut table = self.table.lock().expect("memory runtime lock");
        if let Some(message) = table.fail_list.take() {
            return Err(RuntimeError::Status {
                status: 500,
                message,
            });
        }
        Ok(table
            .containers
            .values()
            .filter(|c| c.running && c.label == label)
            .map(|c| c.record.clone())
            .collect())
    }

    fn stop_sync(&self, id: &str) -> RuntimeResult<()> {
        let mut table = self.table.lock().expect("memory runtime lock");
        if table.fail_stop.contains(id) {
            return Err(RuntimeError::Status {
                status: 500,
                message: format!("cannot stop container {id}"),
            });
        }
        match table.containers.get_mut(id) {
            Some(container) => container.running = false,
            None => {
                return Err(RuntimeError::Status {
                    status: 404,
                    message: format!("no such container: {id}"),
                })
            }
        }
        table.stopped.push(id.to_string());
        debug!(id, "memory runtime stopped replica");
        Ok(())
    }

    fn remove_sync(&self, id: &str) -> RuntimeResult<()> {
        let mut table = self.table.lock().expect("memory runtime lock");
        if table.fail_remove.contains(id) {
            return Err(RuntimeError::Status {
                status: 500,
                message: format!("cannot remove container {id}"),
            });
        }
        if table.containers.remove(id).is_none() {
            return Err(RuntimeError::Status {
                status: 404,
                message: format!("no such container: {id}"),
            });
        }
        table.removed.push(id.to_string());
        debug!(id, "memory runtime removed replica");
        Ok(())
    }
}

impl ContainerRuntime for MemoryRuntime {
    fn list_by_label<'a>(&'a self, label: &'a str) -> RuntimeFuture<'a, Vec<ReplicaRecord>> {
        Box::pin(async move { self.list_sync(label) })
    }

    fn stop<'a>(&'a self, id: &'a str) -> RuntimeFuture<'a, ()> {
        Box::pin(async move { self.stop_sync(id) })
    }

    fn remove<'a>(&'a self, id: &'a str) -> RuntimeFuture<'a, ()> {
        Box::pin(async move { self.remove_sync(id) })
    }
}
