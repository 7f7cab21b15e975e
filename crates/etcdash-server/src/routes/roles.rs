//! Role management routes: `/api/roles/*`

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use etcdash_backend::{Permission, Role};
use etcdash_core::Success;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/roles` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_roles).post(add_role))
        .route("/{name}", delete(delete_role))
        .route("/{name}/permissions", post(grant_permission))
        .route("/{name}/permissions/revoke", post(revoke_permission))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddRoleRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PermissionRequest {
    pub permission: Permission,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_roles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(state.console.auth.get_roles().await?))
}

async fn add_role(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddRoleRequest>,
) -> Result<Json<Role>, AppError> {
    Ok(Json(state.console.auth.add_role(&body.name).await?))
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.auth.delete_role(&name).await?))
}

/// Grant a permission; `null` if the role does not exist.
async fn grant_permission(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<PermissionRequest>,
) -> Result<Json<Option<Role>>, AppError> {
    Ok(Json(
        state
            .console
            .auth
            .grant_permission(&name, &body.permission)
            .await?,
    ))
}

/// Revoke the permission covering the given range; `null` if the role
/// does not exist.
async fn revoke_permission(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<PermissionRequest>,
) -> Result<Json<Option<Role>>, AppError> {
    Ok(Json(
        state
            .console
            .auth
            .revoke_permission(&name, &body.permission)
            .await?,
    ))
}
