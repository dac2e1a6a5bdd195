//! Route handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use cutover_rollout::{JoinError, JoinRequest, PendingDrain};

use crate::ApiState;

/// Response wrapper for JSON endpoints.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Raw `/join` query. Every field is optional so that missing parameters
/// are reported by validation rather than by the extractor.
#[derive(Debug, Default, serde::Deserialize)]
pub struct JoinQuery {
    pub service: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    #[serde(rename = "updateDelay")]
    pub update_delay: Option<String>,
}

/// HTTP status for a failed join.
pub fn status_for(err: &JoinError) -> StatusCode {
    match err {
        JoinError::Validation(_) => StatusCode::BAD_REQUEST,
        JoinError::NotFound(_) => StatusCode::NOT_FOUND,
        JoinError::Runtime(_) | JoinError::Topology(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn join_error(err: JoinError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "join failed");
    } else {
        warn!(error = %err, %status, "join rejected");
    }
    (status, err.to_string()).into_response()
}

/// GET /join
pub async fn join(State(state): State<ApiState>, Query(query): Query<JoinQuery>) -> Response {
    let req = match JoinRequest::parse(
        query.service.as_deref(),
        query.host.as_deref(),
        query.port.as_deref(),
        query.update_delay.as_deref(),
    ) {
        Ok(req) => req,
        Err(e) => return join_error(e),
    };

    match state.controller.join(&req).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()).into_response(),
        Err(e) => join_error(e),
    }
}

/// GET /drains
pub async fn list_drains(State(state): State<ApiState>) -> impl IntoResponse {
    let drains: Vec<PendingDrain> = state.controller.drains().registry().pending();
    ApiResponse::ok(drains)
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use cutover_rollout::{JoinConfig, JoinController};
    use cutover_runtime::{MemoryRuntime, ReplicaRecord};
    use cutover_topology::TopologyStore;

    fn test_state(runtime: &MemoryRuntime, dir: &std::path::Path) -> ApiState {
        ApiState {
            controller: JoinController::new(
                Arc::new(runtime.clone()),
                TopologyStore::new(dir),
                JoinConfig::default(),
            ),
        }
    }

    fn query(service: &str, host: &str, port: &str) -> JoinQuery {
        JoinQuery {
            service: Some(service.to_string()),
            host: Some(host.to_string()),
            port: Some(port.to_string()),
            update_delay: None,
        }
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn join_missing_parameters_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&MemoryRuntime::new(), dir.path());

        let resp = join(State(state), Query(JoinQuery::default())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(resp).await,
            "Missing required parameters (service, host, port)"
        );
    }

    #[tokio::test]
    async fn join_invalid_delay_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = MemoryRuntime::new();
        runtime.add("web", ReplicaRecord::new("r1", "web-1", 1, "10.0.0.1"));
        let state = test_state(&runtime, dir.path());

        let mut q = query("web", "web.example.com", "80");
        q.update_delay = Some("soon".to_string());
        let resp = join(State(state.clone()), Query(q)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!state.controller.topology().path_for("web").exists());
    }

    #[tokio::test]
    async fn join_without_replicas_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&MemoryRuntime::new(), dir.path());

        let resp = join(State(state), Query(query("web", "web.example.com", "80"))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn join_runtime_failure_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = MemoryRuntime::new();
        runtime.fail_next_list("engine unavailable");
        let state = test_state(&runtime, dir.path());

        let resp = join(State(state), Query(query("web", "web.example.com", "80"))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("engine unavailable"));
    }

    #[tokio::test]
    async fn first_and_subsequent_join_messages() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = MemoryRuntime::new();
        runtime.add("web", ReplicaRecord::new("r1", "web-1", 1, "10.0.0.1"));
        let state = test_state(&runtime, dir.path());

        let resp = join(State(state.clone()), Query(query("web", "web.example.com", "80"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "First replica deployed");

        runtime.add("web", ReplicaRecord::new("r2", "web-2", 2, "10.0.0.2"));
        let resp = join(State(state), Query(query("web", "web.example.com", "80"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "Replica joined the load balancer");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&JoinError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&JoinError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&JoinError::Runtime(cutover_runtime::RuntimeError::EmptyLabel)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
