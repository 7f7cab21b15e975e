//! Cluster overview routes: `/api/cluster`, `/api/dashboard`

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use etcdash_backend::ClusterInfo;
use etcdash_core::cluster::DashboardData;

use crate::error::AppError;
use crate::state::AppState;

/// Build the cluster router. Paths are absolute; merge, don't nest.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/cluster", get(cluster_info))
        .route("/api/dashboard", get(dashboard))
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn cluster_info(State(state): State<Arc<AppState>>) -> Result<Json<ClusterInfo>, AppError> {
    Ok(Json(state.console.cluster.cluster_info().await?))
}

/// Everything the dashboard page needs in one response.
async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardData>, AppError> {
    Ok(Json(state.console.cluster.dashboard().await?))
}
