//! Lease inspection and control.
//!
//! The console never models TTL decay: every view re-fetches, and a
//! keep-alive reports the TTL the server hands back.

use std::sync::Arc;

use etcdash_backend::{EtcdBackend, Lease};
use tracing::info;

use crate::Success;
use crate::error::{ConsoleError, ConsoleResultExt};
use crate::validate;

pub struct LeaseAdmin {
    backend: Arc<dyn EtcdBackend>,
}

impl LeaseAdmin {
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>) -> Self {
        Self { backend }
    }

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] on any failure except
    /// not-found, which yields an empty list.
    pub async fn get_leases(&self) -> Result<Vec<Lease>, ConsoleError> {
        self.backend.leases().await.or_not_found(Vec::new())
    }

    /// Revoke a lease by hex ID. Every key attached to it is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed ID, or a
    /// normalized backend error (`NOT_FOUND` for an unknown lease).
    pub async fn revoke_lease(&self, id: &str) -> Result<Success, ConsoleError> {
        let id = validate::lease_id(id)?;
        self.backend.revoke_lease(id).await?;
        info!(lease_id = %id, "lease revoked");
        Ok(Success::ok())
    }

    /// Refresh a lease once. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed ID, or a
    /// normalized backend error.
    pub async fn keep_alive_lease(&self, id: &str) -> Result<Option<Lease>, ConsoleError> {
        let id = validate::lease_id(id)?;
        let lease = self.backend.keep_alive_lease(id).await?;
        if let Some(lease) = &lease {
            info!(lease_id = %id, ttl = lease.ttl, "lease kept alive");
        }
        Ok(lease)
    }
}

#[cfg(test)]
mod tests {
    use etcdash_backend::{LeaseId, MemoryBackend};

    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn keep_alive_restores_granted_ttl() {
        let backend = MemoryBackend::new();
        backend.grant_lease(LeaseId::new(0xabc), 60, &["/lock"]).await;
        let admin = LeaseAdmin::new(Arc::new(backend));

        let lease = admin.keep_alive_lease("abc").await.unwrap().unwrap();
        assert_eq!(lease.ttl, 60);
        assert_eq!(lease.keys, vec!["/lock"]);
        assert!(admin.keep_alive_lease("def").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_unknown_lease_is_not_found() {
        let admin = LeaseAdmin::new(Arc::new(MemoryBackend::new()));
        let err = admin.revoke_lease("123").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let admin = LeaseAdmin::new(Arc::new(MemoryBackend::new()));
        let err = admin.revoke_lease("not-hex").await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn revoked_lease_disappears() {
        let backend = MemoryBackend::new();
        backend.grant_lease(LeaseId::new(0x1), 30, &[]).await;
        let admin = LeaseAdmin::new(Arc::new(backend));

        admin.revoke_lease("1").await.unwrap();
        assert!(admin.get_leases().await.unwrap().is_empty());
    }
}
