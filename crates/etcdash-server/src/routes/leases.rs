//! Lease routes: `/api/leases/*`
//!
//! Lease IDs in paths are hex, as displayed.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use etcdash_backend::Lease;
use etcdash_core::Success;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/leases` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_leases))
        .route("/{id}", delete(revoke_lease))
        .route("/{id}/keepalive", post(keep_alive))
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_leases(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Lease>>, AppError> {
    Ok(Json(state.console.leases.get_leases().await?))
}

async fn revoke_lease(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.leases.revoke_lease(&id).await?))
}

async fn keep_alive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Lease>>, AppError> {
    Ok(Json(state.console.leases.keep_alive_lease(&id).await?))
}
