//! Maintenance routes: `/api/maintenance/*`
//!
//! Concurrency-limited in the top-level router.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use etcdash_core::maintenance::{MaintenanceResult, SnapshotResult};

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/maintenance` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/defragment", post(defragment))
        .route("/compact", post(compact))
        .route("/snapshot", post(snapshot))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompactRequest {
    /// Compact up to this revision; the current revision when absent.
    pub revision: Option<i64>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn defragment(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MaintenanceResult>, AppError> {
    Ok(Json(state.console.maintenance.defragment().await?))
}

/// The body is optional; an empty request compacts to the current revision.
async fn compact(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CompactRequest>>,
) -> Result<Json<MaintenanceResult>, AppError> {
    let revision = body.and_then(|Json(b)| b.revision);
    Ok(Json(state.console.maintenance.compact(revision).await?))
}

async fn snapshot(State(state): State<Arc<AppState>>) -> Result<Json<SnapshotResult>, AppError> {
    Ok(Json(state.console.maintenance.snapshot().await?))
}
