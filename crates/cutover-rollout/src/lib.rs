//! cutover-rollout — weighted cutover between replicas of a service.
//!
//! A join moves all traffic to the newest replica of a service, leaves the
//! older ones in the load balancer at weight 0 so in-flight requests can
//! finish, and schedules each newly superseded replica to be stopped and
//! removed after a grace period.
//!
//! # Components
//!
//! - **`policy`** — decides weights and which replicas are newly superseded
//! - **`registry`** — process-wide set of pending drains (at most one per replica)
//! - **`scheduler`** — delayed stop-then-remove tasks
//! - **`controller`** — the join sequence: discover → load → assign → save → drain
//! - **`request`** — join parameter validation

pub mod controller;
pub mod error;
pub mod policy;
pub mod registry;
pub mod request;
pub mod scheduler;

pub use controller::{JoinConfig, JoinController, JoinOutcome};
pub use error::{DrainError, JoinError, JoinResult};
pub use policy::{assign_weights, Assignment};
pub use registry::{DrainRegistry, PendingDrain};
pub use request::JoinRequest;
pub use scheduler::{DrainOutcome, DrainScheduler};
