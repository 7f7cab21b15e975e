//! Cluster membership routes: `/api/members/*`

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use etcdash_backend::Member;
use etcdash_core::Success;
use etcdash_core::cluster::MoveLeaderResult;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/members` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_members))
        .route("/{id}", put(update_member).delete(remove_member))
        .route("/{id}/promote", post(promote_member))
        .route("/{id}/leader", post(move_leader))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    #[serde(rename = "peerURLs")]
    pub peer_urls: Vec<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_members(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Member>>, AppError> {
    Ok(Json(state.console.cluster.get_members().await?))
}

async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateMemberRequest>,
) -> Result<Json<Option<Member>>, AppError> {
    Ok(Json(
        state
            .console
            .cluster
            .update_member(&id, &body.peer_urls)
            .await?,
    ))
}

async fn promote_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Member>>, AppError> {
    Ok(Json(state.console.cluster.promote_member(&id).await?))
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.cluster.remove_member(&id).await?))
}

async fn move_leader(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MoveLeaderResult>, AppError> {
    Ok(Json(state.console.cluster.move_leader(&id).await?))
}
