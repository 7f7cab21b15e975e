//! Key browser routes: `/api/keys/*`
//!
//! Listing, detail, and browse take their path as a query parameter
//! because etcd keys routinely contain `/` and may start with one.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use etcdash_core::Success;
use etcdash_core::keys::{BrowseResult, KeyDetail, KeyListing};
use etcdash_core::listing::ListQuery;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/keys` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_keys).put(put_key).delete(delete_key))
        .route("/value", get(get_value))
        .route("/browse", get(browse))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub path: String,
    pub filter: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct KeyParam {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct PathParam {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct PutKeyRequest {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Direct children of `path`, filtered and paginated.
async fn list_keys(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<KeyListing>, AppError> {
    let query = ListQuery {
        filter: params.filter,
        page: params.page,
        page_size: params.page_size,
    };
    let listing = state.console.keys.list_keys(&params.path, &query).await?;
    Ok(Json(listing))
}

async fn get_value(
    State(state): State<Arc<AppState>>,
    Query(param): Query<KeyParam>,
) -> Result<Json<KeyDetail>, AppError> {
    Ok(Json(state.console.keys.get_key_value(&param.key).await?))
}

async fn browse(
    State(state): State<Arc<AppState>>,
    Query(param): Query<PathParam>,
) -> Result<Json<BrowseResult>, AppError> {
    Ok(Json(state.console.keys.browse(&param.path).await?))
}

async fn put_key(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PutKeyRequest>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.keys.put_key(&body.key, &body.value).await?))
}

async fn delete_key(
    State(state): State<Arc<AppState>>,
    Query(param): Query<KeyParam>,
) -> Result<Json<Success>, AppError> {
    Ok(Json(state.console.keys.delete_key(&param.key).await?))
}
