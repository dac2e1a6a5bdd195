//! cutover-topology — persisted routing documents.
//!
//! Every service gets one YAML file in the proxy's watched directory,
//! holding its router (host rule + TLS resolver) and its weighted server
//! list. The proxy picks up changes on its own; this crate only reads,
//! merges and rewrites those files.
//!
//! # Components
//!
//! - **`document`** — document model and the route/server merge operations
//! - **`store`** — file layout, load/save with atomic replace, per-service locks
//!
//! Keys this crate does not model (middlewares, `tcp`, sticky sessions)
//! are carried through untouched so hand edits survive a rewrite.

pub mod document;
pub mod error;
pub mod store;

pub use document::{Endpoint, HttpConfig, LoadBalancer, RouteEntry, RoutingDocument, ServiceEntry, TlsConfig};
pub use error::{TopologyError, TopologyResult};
pub use store::{DocumentGuard, TopologyStore};
