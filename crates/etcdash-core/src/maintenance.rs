//! Maintenance operations: defragment, compact, snapshot.
//!
//! Each call is a single forwarded request; the console does not schedule
//! or repeat maintenance on its own.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use etcdash_backend::{BackendError, EtcdBackend};
use serde::Serialize;
use tracing::info;

use crate::error::ConsoleError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotResult {
    pub success: bool,
    /// Where the snapshot was written on the server's filesystem.
    pub path: String,
    /// Bytes written.
    pub size: u64,
}

pub struct MaintenanceAdmin {
    backend: Arc<dyn EtcdBackend>,
    snapshot_dir: PathBuf,
}

impl MaintenanceAdmin {
    /// Snapshots are written under `snapshot_dir`, created on first use.
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>, snapshot_dir: PathBuf) -> Self {
        Self {
            backend,
            snapshot_dir,
        }
    }

    /// Defragment every configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] for the first endpoint that
    /// fails.
    pub async fn defragment(&self) -> Result<MaintenanceResult, ConsoleError> {
        let count = self.backend.defragment().await?;
        info!(endpoints = count, "defragmentation completed");
        Ok(MaintenanceResult {
            success: true,
            message: format!("Defragmentation completed on {count} endpoint(s)"),
        })
    }

    /// Compact history up to `revision`, or up to the current revision
    /// when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a non-positive revision,
    /// or a normalized backend error (future or already compacted
    /// revision).
    pub async fn compact(&self, revision: Option<i64>) -> Result<MaintenanceResult, ConsoleError> {
        let revision = match revision {
            Some(r) if r <= 0 => {
                return Err(ConsoleError::invalid(format!(
                    "revision must be positive, got {r}"
                )));
            }
            Some(r) => r,
            None => self.backend.current_revision().await?,
        };

        self.backend.compact(revision).await?;
        info!(revision, "compaction completed");
        Ok(MaintenanceResult {
            success: true,
            message: format!("Compacted to revision {revision}"),
        })
    }

    /// Stream a snapshot into a timestamped file under the snapshot
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] if the directory cannot be
    /// created or the snapshot stream fails.
    pub async fn snapshot(&self) -> Result<SnapshotResult, ConsoleError> {
        tokio::fs::create_dir_all(&self.snapshot_dir)
            .await
            .map_err(|e| BackendError::Io {
                path: self.snapshot_dir.display().to_string(),
                reason: e.to_string(),
            })?;

        let name = format!("snapshot-{}.db", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        let dest = self.snapshot_dir.join(name);
        let size = self.backend.snapshot(&dest).await?;

        let path = dest.display().to_string();
        info!(path = %path, bytes = size, "snapshot saved");
        Ok(SnapshotResult {
            success: true,
            path,
            size,
        })
    }
}
