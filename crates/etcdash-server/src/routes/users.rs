//! User management routes: `/api/users/*`
//!
//! Role grants return the updated user, or `null` when the user does not
//! exist.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use etcdash_backend::User;
use etcdash_core::Success;
use etcdash_core::auth::NewUser;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/users` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(add_user))
        .route("/{name}", delete(delete_user))
        .route("/{name}/roles", post(grant_role))
        .route("/{name}/roles/{role}", delete(revoke_role))
        .route("/{name}/password", post(change_password))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    pub name: String,
    pub password: String,
    pub password_confirmation: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub password: String,
    pub password_confirmation: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.console.auth.get_users().await?))
}

async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = state
        .console
        .auth
        .add_user(NewUser {
            name: body.name,
            password: body.password,
            password_confirmation: body.password_confirmation,
            roles: body.roles,
        })
        .await?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.auth.delete_user(&name).await?))
}

async fn grant_role(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<GrantRoleRequest>,
) -> Result<Json<Option<User>>, AppError> {
    Ok(Json(state.console.auth.grant_user_role(&name, &body.role).await?))
}

async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Path((name, role)): Path<(String, String)>,
) -> Result<Json<Option<User>>, AppError> {
    Ok(Json(state.console.auth.revoke_user_role(&name, &role).await?))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Success>, AppError> {
    let result = state
        .console
        .auth
        .change_password(&name, &body.password, body.password_confirmation.as_deref())
        .await?;
    Ok(Json(result))
}
