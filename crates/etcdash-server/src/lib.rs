//! `etcdash` HTTP server.
//!
//! Wires the console services and the selected backend into a running Axum
//! server. Serves the JSON API at `/api/*` and a landing page at `/`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
