#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use etcdash_backend::{DemoConfig, MemoryBackend};
use etcdash_server::config::BackendMode;
use etcdash_server::routes::build_router;
use etcdash_server::state::AppState;

/// Router over a fresh demo cluster, plus a handle to poke the cluster
/// directly.
pub struct TestApp {
    pub router: Router,
    pub backend: MemoryBackend,
    pub snapshot_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let backend = MemoryBackend::demo(DemoConfig::default());
        let snapshot_dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::new(
            Arc::new(backend.clone()),
            BackendMode::Mock,
            snapshot_dir.path().to_path_buf(),
        );
        Self {
            router: build_router(Arc::new(state)),
            backend,
            snapshot_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json")
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(empty_request("GET", uri)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(empty_request("DELETE", uri)).await
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn put(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(json_request("PUT", uri, body)).await
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}
