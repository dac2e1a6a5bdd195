//! cutover-api — HTTP surface of the cutover daemon.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/join?service=&host=&port=&updateDelay=` | Cut traffic over to the newest replica |
//! | GET | `/drains` | Pending replica teardowns (JSON) |
//! | GET | `/healthz` | Liveness |
//!
//! `/join` answers in plain text: 200 on success, 400 for missing or
//! invalid parameters, 404 when the service has no running replicas and
//! 500 for runtime or document failures.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use cutover_rollout::JoinController;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: JoinController,
}

/// Build the complete API router.
pub fn build_router(controller: JoinController) -> Router {
    let state = ApiState { controller };

    Router::new()
        .route("/join", get(handlers::join))
        .route("/drains", get(handlers::list_drains))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
