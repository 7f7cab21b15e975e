//! HTTP routes.
//!
//! Each submodule owns one area of the API and exposes a `router()` that
//! is nested under its prefix here.

pub mod alarms;
pub mod auth;
pub mod cluster;
pub mod endpoints;
pub mod keys;
pub mod leases;
pub mod maintenance;
pub mod members;
pub mod roles;
pub mod ui;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Maintenance calls are heavy on the cluster; run at most this many at once.
const MAINTENANCE_CONCURRENCY: usize = 2;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let maintenance_routes = Router::new()
        .nest("/api/maintenance", maintenance::router())
        .layer(ConcurrencyLimitLayer::new(MAINTENANCE_CONCURRENCY));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(cluster::router())
        .nest("/api/keys", keys::router())
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router())
        .nest("/api/roles", roles::router())
        .nest("/api/leases", leases::router())
        .nest("/api/members", members::router())
        .nest("/api/alarms", alarms::router())
        .nest("/api/endpoints", endpoints::router())
        .merge(maintenance_routes)
        .merge(ui::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
