//! Core library for `etcdash`.
//!
//! Projects etcd's flat key space into a browsable hierarchy, normalizes
//! backend failures into a closed error taxonomy, and wraps every
//! administrative operation with light input validation. This crate
//! depends on `etcdash-backend` for the [`EtcdBackend`] trait and knows
//! nothing about HTTP.

pub mod auth;
pub mod cluster;
pub mod error;
pub mod keys;
pub mod lease;
pub mod listing;
pub mod maintenance;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use etcdash_backend::EtcdBackend;
use serde::Serialize;

use crate::auth::AuthAdmin;
use crate::cluster::ClusterAdmin;
use crate::keys::KeyBrowser;
use crate::lease::LeaseAdmin;
use crate::maintenance::MaintenanceAdmin;

/// Acknowledgement for mutations that return no entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    #[must_use]
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

/// Every console service, sharing one backend.
pub struct Console {
    pub keys: KeyBrowser,
    pub auth: AuthAdmin,
    pub leases: LeaseAdmin,
    pub cluster: ClusterAdmin,
    pub maintenance: MaintenanceAdmin,
}

impl Console {
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>, snapshot_dir: PathBuf) -> Self {
        Self {
            keys: KeyBrowser::new(Arc::clone(&backend)),
            auth: AuthAdmin::new(Arc::clone(&backend)),
            leases: LeaseAdmin::new(Arc::clone(&backend)),
            cluster: ClusterAdmin::new(Arc::clone(&backend)),
            maintenance: MaintenanceAdmin::new(backend, snapshot_dir),
        }
    }
}
