//! cutover-runtime — replica discovery and runtime control.
//!
//! Cutover never starts containers itself; it only needs to find the
//! running replicas of a service and, later, stop and remove the ones that
//! were superseded. This crate defines that narrow contract as the
//! [`ContainerRuntime`] trait and ships two implementations:
//!
//! - **`docker`** — Docker Engine API over the local unix socket
//! - **`memory`** — in-process table, for tests and dry runs
//!
//! [`discover`] wraps `list_by_label` and applies the ordering the rest of
//! the system relies on (newest replica first).

pub mod discovery;
pub mod docker;
pub mod error;
pub mod memory;
pub mod types;

use std::future::Future;
use std::pin::Pin;

pub use discovery::discover;
pub use docker::DockerRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use memory::MemoryRuntime;
pub use types::ReplicaRecord;

/// Boxed future returned by [`ContainerRuntime`] operations.
pub type RuntimeFuture<'a, T> = Pin<Box<dyn Future<Output = RuntimeResult<T>> + Send + 'a>>;

/// Control surface of the container runtime.
pub trait ContainerRuntime: Send + Sync {
    /// List running replicas carrying the given label. Order is unspecified.
    fn list_by_label<'a>(&'a self, label: &'a str) -> RuntimeFuture<'a, Vec<ReplicaRecord>>;

    /// Stop a replica by identifier. Stopping an already stopped replica succeeds.
    fn stop<'a>(&'a self, id: &'a str) -> RuntimeFuture<'a, ()>;

    /// Remove a stopped replica by identifier.
    fn remove<'a>(&'a self, id: &'a str) -> RuntimeFuture<'a, ()>;
}
