//! Shared application state for the `etcdash` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. The backend is chosen once, before the state
//! exists, and never swapped afterwards.

use std::path::PathBuf;
use std::sync::Arc;

use etcdash_backend::EtcdBackend;
use etcdash_core::Console;

use crate::config::BackendMode;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Console services over the selected backend.
    pub console: Console,
    /// Whether the backend is the in-memory demo cluster.
    pub mode: BackendMode,
    /// Configured endpoints, for the landing page.
    pub endpoints: Vec<String>,
}

impl AppState {
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>, mode: BackendMode, snapshot_dir: PathBuf) -> Self {
        let endpoints = backend.endpoints();
        Self {
            console: Console::new(backend, snapshot_dir),
            mode,
            endpoints,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("mode", &self.mode)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}
