//! `etcdash` server entry point.
//!
//! Selects the backend once from configuration, then serves the JSON API
//! and landing page with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use etcdash_backend::{DemoConfig, EtcdBackend, MemoryBackend};
use etcdash_server::config::{BackendMode, ServerConfig};
use etcdash_server::routes;
use etcdash_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(backend = ?config.backend, endpoints = ?config.endpoints, "etcdash starting");

    let backend = build_backend(&config).await?;
    let state = Arc::new(AppState::new(
        backend,
        config.backend,
        config.snapshot_dir.clone(),
    ));

    let app = routes::build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "etcdash listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("etcdash stopped");
    Ok(())
}

/// Construct the backend selected by configuration.
async fn build_backend(config: &ServerConfig) -> anyhow::Result<Arc<dyn EtcdBackend>> {
    match config.backend {
        BackendMode::Mock => {
            info!(cluster = %config.cluster_name, "using in-memory demo cluster");
            Ok(Arc::new(MemoryBackend::demo(DemoConfig {
                cluster_name: config.cluster_name.clone(),
                endpoints: config.endpoints.clone(),
            })))
        }
        BackendMode::Live => connect_live(config).await,
    }
}

#[cfg(feature = "live-backend")]
async fn connect_live(config: &ServerConfig) -> anyhow::Result<Arc<dyn EtcdBackend>> {
    use etcdash_backend::{LiveBackend, LiveConfig, TlsConfig};

    let tls = config.has_tls().then(|| TlsConfig {
        ca_cert: config.ca_cert.clone(),
        client_cert: config.client_cert.clone(),
        client_key: config.client_key.clone(),
    });
    let backend = LiveBackend::connect(LiveConfig {
        endpoints: config.endpoints.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        dial_timeout: config.dial_timeout,
        tls,
        cluster_name: config.cluster_name.clone(),
    })
    .await
    .with_context(|| format!("failed to connect to etcd at {:?}", config.endpoints))?;

    info!(tls = config.has_tls(), "connected to etcd");
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "live-backend"))]
#[allow(clippy::unused_async)]
async fn connect_live(_config: &ServerConfig) -> anyhow::Result<Arc<dyn EtcdBackend>> {
    anyhow::bail!("built without the `live-backend` feature; set ETCD_MOCK_MODE=true")
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
