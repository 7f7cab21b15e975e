//! Endpoint probe routes: `/api/endpoints/*`
//!
//! Probes never fail as a whole; unreachable endpoints show up as
//! unhealthy (health) or are left out (status).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use etcdash_backend::{EndpointHealth, EndpointStatus};

use crate::state::AppState;

/// Build the `/api/endpoints` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Vec<EndpointHealth>> {
    Json(state.console.cluster.endpoint_health().await)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Vec<EndpointStatus>> {
    Json(state.console.cluster.endpoint_status().await)
}
