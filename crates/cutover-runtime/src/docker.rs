//! Docker Engine API client over the local unix socket.
//!
//! Each call opens a fresh connection, performs one HTTP/1.1 exchange
//! and drops it. Join traffic is a handful of requests per deploy, so
//! there is no connection pool.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::ReplicaRecord;
use crate::{ContainerRuntime, RuntimeFuture};

/// Convert any `Display` error into a `RuntimeError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| RuntimeError::$variant(e.to_string())
    };
}

/// Default location of the Docker daemon socket.
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Default upper bound on one engine request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ContainerRuntime`] backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    socket: PathBuf,
    network: String,
    timeout: Duration,
}

impl DockerRuntime {
    /// Create a client for the engine at `socket`, reading replica
    /// addresses from the `network` the proxy shares with the replicas.
    pub fn new(socket: impl Into<PathBuf>, network: &str) -> Self {
        Self {
            socket: socket.into(),
            network: network.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound every engine request by `timeout` instead of [`DEFAULT_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, method: Method, path: &str) -> RuntimeResult<(StatusCode, Bytes)> {
        match tokio::time::timeout(self.timeout, self.exchange(method.clone(), path)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%method, path, timeout_ms = self.timeout.as_millis() as u64, "runtime call timed out");
                Err(RuntimeError::Http(format!(
                    "{method} {path} timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    async fn exchange(&self, method: Method, path: &str) -> RuntimeResult<(StatusCode, Bytes)> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|e| RuntimeError::Connect(format!("{}: {e}", self.socket.display())))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Empty<Bytes>>(io)
            .await
            .map_err(map_err!(Http))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "runtime connection closed with error");
            }
        });

        let req = Request::builder()
            .method(method.clone())
            .uri(path)
            .header(http::header::HOST, "docker")
            .header(http::header::USER_AGENT, "cutover/0.1")
            .body(Empty::<Bytes>::new())
            .map_err(map_err!(Http))?;

        let resp = sender.send_request(req).await.map_err(map_err!(Http))?;
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(map_err!(Http))?
            .to_bytes();

        debug!(%method, path, %status, "runtime call");
        Ok((status, body))
    }

    async fn list(&self, label: &str) -> RuntimeResult<Vec<ReplicaRecord>> {
        let (status, body) = self.call(Method::GET, &list_path(label)).await?;
        if status != StatusCode::OK {
            return Err(status_error(status, &body));
        }

        let summaries: Vec<ContainerSummary> =
            serde_json::from_slice(&body).map_err(map_err!(Decode))?;

        Ok(summaries
            .into_iter()
            .filter_map(|s| into_replica(s, &self.network))
            .collect())
    }

    async fn stop_container(&self, id: &str) -> RuntimeResult<()> {
        let (status, body) = self
            .call(Method::POST, &format!("/containers/{id}/stop"))
            .await?;
        match status {
            // 304: already stopped.
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => Ok(()),
            _ => Err(status_error(status, &body)),
        }
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        let (status, body) = self
            .call(Method::DELETE, &format!("/containers/{id}"))
            .await?;
        match status {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => Err(status_error(status, &body)),
        }
    }
}

impl ContainerRuntime for DockerRuntime {
    fn list_by_label<'a>(&'a self, label: &'a str) -> RuntimeFuture<'a, Vec<ReplicaRecord>> {
        Box::pin(self.list(label))
    }

    fn stop<'a>(&'a self, id: &'a str) -> RuntimeFuture<'a, ()> {
        Box::pin(self.stop_container(id))
    }

    fn remove<'a>(&'a self, id: &'a str) -> RuntimeFuture<'a, ()> {
        Box::pin(self.remove_container(id))
    }
}

// ── Engine wire types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerSummary {
    id: String,
    #[serde(default)]
    names: Vec<String>,
    created: i64,
    #[serde(default)]
    network_settings: Option<NetworkSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkSettings {
    #[serde(default)]
    networks: BTreeMap<String, NetworkEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
struct NetworkEndpoint {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct EngineMessage {
    message: String,
}

/// `/containers/json` path filtered to containers carrying `label`.
fn list_path(label: &str) -> String {
    let filters = serde_json::json!({ "label": [label] }).to_string();
    let encoded: String = url::form_urlencoded::byte_serialize(filters.as_bytes()).collect();
    format!("/containers/json?filters={encoded}")
}

/// Turn an engine summary into a replica, picking its address on `network`.
///
/// Falls back to the first attached network with an address; replicas
/// with no address at all cannot receive traffic and are skipped.
fn into_replica(summary: ContainerSummary, network: &str) -> Option<ReplicaRecord> {
    let networks = summary.network_settings.unwrap_or_default().networks;
    let address = networks
        .get(network)
        .map(|n| n.ip_address.clone())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            networks
                .values()
                .map(|n| n.ip_address.clone())
                .find(|ip| !ip.is_empty())
        });

    let name = summary
        .names
        .first()
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| summary.id.clone());

    match address {
        Some(address) => Some(ReplicaRecord {
            id: summary.id,
            name,
            created_at: summary.created,
            address,
        }),
        None => {
            warn!(replica = %name, network, "replica has no network address, skipping");
            None
        }
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> RuntimeError {
    let message = serde_json::from_slice::<EngineMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string());
    RuntimeError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(json: &str) -> ContainerSummary {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn list_path_encodes_label_filter() {
        let path = list_path("web");
        assert_eq!(
            path,
            "/containers/json?filters=%7B%22label%22%3A%5B%22web%22%5D%7D"
        );
    }

    #[test]
    fn replica_uses_configured_network() {
        let s = summary(
            r#"{
                "Id": "abc123",
                "Names": ["/web-2"],
                "Created": 1700000000,
                "NetworkSettings": { "Networks": {
                    "bridge": { "IPAddress": "172.17.0.5" },
                    "main": { "IPAddress": "10.1.0.7" }
                } }
            }"#,
        );
        let r = into_replica(s, "main").unwrap();
        assert_eq!(r.id, "abc123");
        assert_eq!(r.name, "web-2");
        assert_eq!(r.created_at, 1_700_000_000);
        assert_eq!(r.address, "10.1.0.7");
    }

    #[test]
    fn replica_falls_back_to_other_network() {
        let s = summary(
            r#"{
                "Id": "abc123",
                "Names": ["/web-2"],
                "Created": 1,
                "NetworkSettings": { "Networks": { "bridge": { "IPAddress": "172.17.0.5" } } }
            }"#,
        );
        assert_eq!(into_replica(s, "main").unwrap().address, "172.17.0.5");
    }

    #[test]
    fn replica_without_address_is_skipped() {
        let s = summary(r#"{ "Id": "abc", "Names": [], "Created": 1 }"#);
        assert!(into_replica(s, "main").is_none());
    }

    #[test]
    fn status_error_prefers_engine_message() {
        let err = status_error(StatusCode::NOT_FOUND, br#"{"message":"No such container: x"}"#);
        match err {
            RuntimeError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No such container: x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_raw_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, b"upstream down\n");
        assert_eq!(err.to_string(), "runtime returned 502: upstream down");
    }
}
