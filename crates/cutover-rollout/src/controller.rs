//! Join controller — sequences one cutover.
//!
//! ```text
//! join(request)
//!   ├── lock service document
//!   ├── discover replicas (newest first)  ── none → NotFound
//!   ├── load document, ensure router
//!   ├── assign weights
//!   ├── save document                     ── failure → nothing scheduled
//!   └── schedule drains for newly superseded replicas
//! ```
//!
//! The document is saved before any drain is scheduled, so a failed save
//! never leaves a teardown pending for a replica the proxy still routes to.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use cutover_runtime::{discover, ContainerRuntime};
use cutover_topology::{Endpoint, TopologyStore};

use crate::error::{JoinError, JoinResult};
use crate::policy::assign_weights;
use crate::registry::DrainRegistry;
use crate::request::JoinRequest;
use crate::scheduler::{DrainOutcome, DrainScheduler};

/// Settings applied to every join.
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// TLS certificate resolver written into new routers.
    pub cert_resolver: String,
    /// Grace period used when a request does not specify one.
    pub default_delay: Duration,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            cert_resolver: "letsencrypt".to_string(),
            default_delay: Duration::from_secs(5 * 60),
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub service: String,
    /// The service had no entry in its document before this join.
    pub created: bool,
    /// Name of the replica now receiving all traffic.
    pub active: String,
    /// Endpoints written to the document.
    pub endpoints: Vec<Endpoint>,
    /// Ids of replicas whose drain was scheduled by this join.
    pub scheduled: Vec<String>,
}

impl JoinOutcome {
    /// Status line for the caller.
    pub fn message(&self) -> &'static str {
        if self.created {
            "First replica deployed"
        } else {
            "Replica joined the load balancer"
        }
    }
}

/// Runs joins. Cheap to clone; clones share the store locks and registry.
#[derive(Clone)]
pub struct JoinController {
    runtime: Arc<dyn ContainerRuntime>,
    topology: TopologyStore,
    drains: DrainScheduler,
    config: Arc<JoinConfig>,
}

impl JoinController {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, topology: TopologyStore, config: JoinConfig) -> Self {
        let drains = DrainScheduler::new(Arc::clone(&runtime), DrainRegistry::new());
        Self {
            runtime,
            topology,
            drains,
            config: Arc::new(config),
        }
    }

    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub fn drains(&self) -> &DrainScheduler {
        &self.drains
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Cut traffic over to the newest replica of `req.service`.
    pub async fn join(&self, req: &JoinRequest) -> JoinResult<JoinOutcome> {
        let service = req.service.as_str();
        let delay = req.delay.unwrap_or(self.config.default_delay);
        info!(service, host = %req.host, port = %req.port, "joining service");

        let _guard = self.topology.lock(service).await;

        let replicas = discover(self.runtime.as_ref(), service).await?;
        let Some(newest) = replicas.first() else {
            return Err(JoinError::NotFound(service.to_string()));
        };

        let mut doc = self.topology.load(service).await?;
        let created = !doc.has_service(service);
        doc.ensure_route(service, &req.host, &self.config.cert_resolver);

        let assignment = assign_weights(&replicas, &req.port, self.drains.registry());
        doc.set_servers(service, assignment.endpoints.clone());
        self.topology.save(service, &doc).await?;

        let mut scheduled = Vec::new();
        for replica in &assignment.superseded {
            match self.drains.schedule_drain(&replica.id, &replica.name, delay) {
                DrainOutcome::Scheduled => scheduled.push(replica.id.clone()),
                DrainOutcome::AlreadyPending => {
                    debug!(service, replica = %replica.name, "replica already draining");
                }
            }
        }

        info!(
            service,
            created,
            active = %newest.name,
            replicas = replicas.len(),
            drains = scheduled.len(),
            "replica joined"
        );

        Ok(JoinOutcome {
            service: service.to_string(),
            created,
            active: newest.name.clone(),
            endpoints: assignment.endpoints,
            scheduled,
        })
    }
}
