//! Server configuration for `etcdash`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Console settings use `ETCDASH_*`; cluster connection settings use the
//! `ETCD_*` names etcd tooling already understands.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default bind address when neither `ETCDASH_BIND_ADDR` nor `PORT` is set.
const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);

/// Endpoints the demo cluster advertises when none are configured.
const DEMO_ENDPOINTS: [&str; 3] = ["http://etcd-1:2379", "http://etcd-2:2379", "http://etcd-3:2379"];

/// Which backend the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Seeded in-memory cluster; nothing persists.
    Mock,
    /// A real etcd cluster.
    Live,
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    pub backend: BackendMode,
    /// etcd client endpoints, in probe order.
    pub endpoints: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub dial_timeout: Duration,
    /// PEM text of the CA bundle.
    pub ca_cert: Option<String>,
    /// PEM text of the client certificate.
    pub client_cert: Option<String>,
    /// PEM text of the client private key.
    pub client_key: Option<String>,
    /// Display name for the cluster.
    pub cluster_name: String,
    /// Directory snapshots are written to.
    pub snapshot_dir: PathBuf,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("backend", &self.backend)
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("dial_timeout", &self.dial_timeout)
            .field("tls", &self.has_tls())
            .field("cluster_name", &self.cluster_name)
            .field("snapshot_dir", &self.snapshot_dir)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `ETCDASH_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `ETCDASH_LOG_LEVEL`: log filter (default: `info`)
    /// - `ETCD_MOCK_MODE`: `true`/`1` serves the in-memory demo cluster (default: `false`)
    /// - `ETCD_ENDPOINTS`: comma-separated client URLs (default: `http://127.0.0.1:2379`,
    ///   or the three demo members in mock mode)
    /// - `ETCD_USERNAME` / `ETCD_PASSWORD`: credentials (optional)
    /// - `ETCD_DIAL_TIMEOUT`: connect timeout in milliseconds (default: `3000`)
    /// - `ETCD_CA_CERT`, `ETCD_CLIENT_CERT`, `ETCD_CLIENT_KEY`: PEM text for TLS (optional)
    /// - `ETCDASH_CLUSTER_NAME`: display name (default: `etcd-cluster`)
    /// - `ETCDASH_SNAPSHOT_DIR`: where snapshots are written (default: `./snapshots`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: ETCDASH_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Some(addr) = var("ETCDASH_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(DEFAULT_BIND))
        } else if let Some(port_str) = var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_BIND.1);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(DEFAULT_BIND)
        };

        let log_level = var("ETCDASH_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let backend = if var("ETCD_MOCK_MODE").is_some_and(|v| v == "true" || v == "1") {
            BackendMode::Mock
        } else {
            BackendMode::Live
        };

        let mut endpoints: Vec<String> = var("ETCD_ENDPOINTS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if endpoints.is_empty() {
            endpoints = match backend {
                BackendMode::Live => vec!["http://127.0.0.1:2379".to_owned()],
                BackendMode::Mock => DEMO_ENDPOINTS.iter().map(|&e| e.to_owned()).collect(),
            };
        }

        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let dial_timeout = Duration::from_millis(
            var("ETCD_DIAL_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        );

        Self {
            bind_addr,
            log_level,
            backend,
            endpoints,
            username: non_empty("ETCD_USERNAME"),
            password: var("ETCD_PASSWORD"),
            dial_timeout,
            ca_cert: non_empty("ETCD_CA_CERT"),
            client_cert: non_empty("ETCD_CLIENT_CERT"),
            client_key: non_empty("ETCD_CLIENT_KEY"),
            cluster_name: var("ETCDASH_CLUSTER_NAME")
                .unwrap_or_else(|| "etcd-cluster".to_owned()),
            snapshot_dir: var("ETCDASH_SNAPSHOT_DIR")
                .map_or_else(|| PathBuf::from("./snapshots"), PathBuf::from),
        }
    }

    /// Whether any TLS material was supplied.
    #[must_use]
    pub fn has_tls(&self) -> bool {
        self.ca_cert.is_some() || self.client_cert.is_some() || self.client_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]);
        assert_eq!(c.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(c.backend, BackendMode::Live);
        assert_eq!(c.endpoints, vec!["http://127.0.0.1:2379"]);
        assert_eq!(c.dial_timeout, Duration::from_millis(3000));
        assert_eq!(c.cluster_name, "etcd-cluster");
        assert!(!c.has_tls());
    }

    #[test]
    fn bind_addr_overrides_port() {
        let c = config(&[("PORT", "9000"), ("ETCDASH_BIND_ADDR", "127.0.0.1:7000")]);
        assert_eq!(c.bind_addr.port(), 7000);

        let c = config(&[("PORT", "9000")]);
        assert_eq!(c.bind_addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
    }

    #[test]
    fn endpoints_split_on_commas() {
        let c = config(&[("ETCD_ENDPOINTS", "http://a:2379, http://b:2379,,")]);
        assert_eq!(c.endpoints, vec!["http://a:2379", "http://b:2379"]);
    }

    #[test]
    fn mock_mode_flag() {
        assert_eq!(config(&[("ETCD_MOCK_MODE", "1")]).backend, BackendMode::Mock);
        assert_eq!(config(&[("ETCD_MOCK_MODE", "true")]).backend, BackendMode::Mock);
        assert_eq!(config(&[("ETCD_MOCK_MODE", "yes")]).backend, BackendMode::Live);
    }

    #[test]
    fn mock_mode_defaults_to_demo_endpoints() {
        let c = config(&[("ETCD_MOCK_MODE", "true")]);
        assert_eq!(c.endpoints.len(), 3);
        assert_eq!(c.endpoints[0], "http://etcd-1:2379");

        let c = config(&[("ETCD_MOCK_MODE", "true"), ("ETCD_ENDPOINTS", "http://x:2379")]);
        assert_eq!(c.endpoints, vec!["http://x:2379"]);
    }

    #[test]
    fn debug_redacts_password() {
        let c = config(&[("ETCD_USERNAME", "root"), ("ETCD_PASSWORD", "hunter2")]);
        let debug = format!("{c:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("root"));
    }
}
