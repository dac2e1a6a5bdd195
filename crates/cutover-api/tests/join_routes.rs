//! Router-level tests: requests go through axum's query parsing and routing.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use cutover_api::build_router;
use cutover_rollout::{JoinConfig, JoinController};
use cutover_runtime::{MemoryRuntime, ReplicaRecord};
use cutover_topology::TopologyStore;

struct TestApp {
    dir: tempfile::TempDir,
    runtime: MemoryRuntime,
    router: Router,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MemoryRuntime::new();
    let controller = JoinController::new(
        Arc::new(runtime.clone()),
        TopologyStore::new(dir.path()),
        JoinConfig::default(),
    );
    TestApp {
        dir,
        runtime,
        router: build_router(controller),
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn healthz_ok() {
    let app = test_app();
    let (status, body) = get(&app.router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn join_requires_service_host_port() {
    let app = test_app();
    for uri in [
        "/join",
        "/join?service=web&host=web.example.com",
        "/join?service=web&port=80",
        "/join?host=web.example.com&port=80",
        "/join?service=&host=web.example.com&port=80",
    ] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, "Missing required parameters (service, host, port)");
    }
}

#[tokio::test]
async fn join_unknown_service_is_404_without_file() {
    let app = test_app();
    let (status, _) = get(&app.router, "/join?service=web&host=web.example.com&port=80").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!app.dir.path().join("web.yml").exists());
}

#[tokio::test]
async fn join_writes_document_and_lists_drains() {
    let app = test_app();
    app.runtime.add("web", ReplicaRecord::new("old", "web-1", 100, "10.0.0.1"));

    let (status, body) = get(
        &app.router,
        "/join?service=web&host=web.example.com&port=8080&updateDelay=10",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "First replica deployed");

    app.runtime.add("web", ReplicaRecord::new("new", "web-2", 200, "10.0.0.2"));
    let (status, body) = get(
        &app.router,
        "/join?service=web&host=web.example.com&port=8080&updateDelay=10",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Replica joined the load balancer");

    let yaml = std::fs::read_to_string(app.dir.path().join("web.yml")).unwrap();
    assert!(yaml.contains("Host(`web.example.com`)"));
    assert!(yaml.contains("certResolver: letsencrypt"));
    assert!(yaml.contains("service: web@file"));
    assert!(yaml.contains("http://10.0.0.2:8080"));

    let (status, body) = get(&app.router, "/drains").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    let drains = json["data"].as_array().unwrap();
    assert_eq!(drains.len(), 1);
    assert_eq!(drains[0]["replica_id"], "old");
    assert_eq!(drains[0]["replica_name"], "web-1");
    let scheduled = drains[0]["scheduled_at"].as_u64().unwrap();
    assert_eq!(drains[0]["due_at"].as_u64().unwrap(), scheduled + 600);
}

#[tokio::test]
async fn join_rejects_negative_delay() {
    let app = test_app();
    app.runtime.add("web", ReplicaRecord::new("a", "web-1", 100, "10.0.0.1"));

    let (status, body) = get(
        &app.router,
        "/join?service=web&host=web.example.com&port=80&updateDelay=-5",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("updateDelay"));
}

#[tokio::test]
async fn malformed_document_returns_500_and_is_kept() {
    let app = test_app();
    app.runtime.add("web", ReplicaRecord::new("a", "web-1", 100, "10.0.0.1"));
    let path = app.dir.path().join("web.yml");
    std::fs::write(&path, "http: {routers: [\n").unwrap();

    let (status, body) = get(&app.router, "/join?service=web&host=web.example.com&port=80").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("malformed routing document"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "http: {routers: [\n");
}
