//! Routing document model.
//!
//! Mirrors the subset of the proxy's dynamic file configuration that
//! cutover manages:
//!
//! ```yaml
//! http:
//!   routers:
//!     web: { rule: "Host(`web.example.com`)", tls: { certResolver: letsencrypt }, service: web@file }
//!   services:
//!     web: { loadBalancer: { servers: [ { url: "http://10.0.0.2:8080", weight: 100 } ] } }
//! ```
//!
//! Maps are ordered so that serializing the same document twice yields
//! the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

/// Unmodelled keys, kept verbatim.
pub type Extra = BTreeMap<String, Value>;

/// One routing document (one file, usually one service).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingDocument {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The `http` section: routers and services by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub routers: BTreeMap<String, RouteEntry>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceEntry>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A router: which requests go to which service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    pub service: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(rename = "certResolver")]
    pub cert_resolver: String,
}

/// A service definition. Only the load-balancer form is managed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(
        rename = "loadBalancer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub load_balancer: Option<LoadBalancer>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(default)]
    pub servers: Vec<Endpoint>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One weighted backend URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub weight: u32,
}

impl Endpoint {
    pub fn new(url: &str, weight: u32) -> Self {
        Self {
            url: url.to_string(),
            weight,
        }
    }
}

impl RoutingDocument {
    /// Whether the document already defines `service`.
    pub fn has_service(&self, service: &str) -> bool {
        self.http.services.contains_key(service)
    }

    /// Insert the router for `service` unless one already exists.
    ///
    /// Returns true if a router was inserted. An existing router is never
    /// modified, even if `host` or `cert_resolver` differ.
    pub fn ensure_route(&mut self, service: &str, host: &str, cert_resolver: &str) -> bool {
        if self.http.routers.contains_key(service) {
            return false;
        }
        self.http.routers.insert(
            service.to_string(),
            RouteEntry {
                rule: format!("Host(`{host}`)"),
                tls: Some(TlsConfig {
                    cert_resolver: cert_resolver.to_string(),
                }),
                service: format!("{service}@file"),
                extra: Extra::new(),
            },
        );
        debug!(service, host, "router created");
        true
    }

    /// Replace the server list of `service`, creating the service if needed.
    ///
    /// Other keys of the service and of its load balancer are kept, as is
    /// every other router and service in the document.
    pub fn set_servers(&mut self, service: &str, servers: Vec<Endpoint>) {
        let entry = self.http.services.entry(service.to_string()).or_default();
        entry.load_balancer.get_or_insert_with(LoadBalancer::default).servers = servers;
    }

    /// Current servers of `service`, if it has a load balancer.
    pub fn servers(&self, service: &str) -> Option<&[Endpoint]> {
        self.http
            .services
            .get(service)
            .and_then(|s| s.load_balancer.as_ref())
            .map(|lb| lb.servers.as_slice())
    }
}
