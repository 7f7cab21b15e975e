//! Alarm routes: `/api/alarms/*`

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use etcdash_backend::{Alarm, AlarmType};
use etcdash_core::Success;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/alarms` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_alarms))
        .route("/disarm", post(disarm))
        .route("/disarm-all", post(disarm_all))
}

#[derive(Debug, Deserialize)]
pub struct DisarmRequest {
    #[serde(rename = "memberID")]
    pub member_id: String,
    pub alarm: AlarmType,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_alarms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Alarm>>, AppError> {
    Ok(Json(state.console.cluster.get_alarms().await?))
}

async fn disarm(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DisarmRequest>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(
        state
            .console
            .cluster
            .disarm_alarm(&body.member_id, body.alarm)
            .await?,
    ))
}

async fn disarm_all(State(state): State<Arc<AppState>>) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.cluster.disarm_all_alarms().await?))
}
