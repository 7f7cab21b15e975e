//! Auth status route: `/api/auth/status`

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use etcdash_backend::AuthStatus;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/auth` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(auth_status))
}

async fn auth_status(State(state): State<Arc<AppState>>) -> Result<Json<AuthStatus>, AppError> {
    Ok(Json(state.console.auth.auth_status().await?))
}
