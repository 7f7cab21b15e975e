//! Backend abstraction for `etcdash`.
//!
//! This crate defines the [`EtcdBackend`] trait: the full capability set the
//! console needs from an etcd cluster (key-value primitives, auth, leases,
//! membership, alarms, endpoint probes, maintenance). It knows nothing
//! about directory projection, validation, or HTTP; those live in
//! `etcdash-core` and `etcdash-server`.
//!
//! Two implementations are provided, selected once at startup:
//!
//! - `LiveBackend`: talks to a real cluster through `etcd-client` (feature `live-backend`)
//! - [`MemoryBackend`]: in-memory demo cluster, for mock mode and tests

mod error;
pub mod id;
#[cfg(feature = "live-backend")]
mod live;
mod memory;
pub mod types;

use std::path::Path;

pub use error::BackendError;
pub use id::{LeaseId, MemberId};
#[cfg(feature = "live-backend")]
pub use live::{LiveBackend, LiveConfig, TlsConfig};
pub use memory::{DemoConfig, KvRead, MemoryBackend};
pub use types::{
    Alarm, AlarmType, AuthStatus, ClusterInfo, EndpointHealth, EndpointStatus, Key, KeyValue,
    Lease, Member, Permission, PermissionType, Role, User,
};

/// The etcd capability contract.
///
/// Keys are UTF-8 strings; values are opaque bytes. Every call is an
/// independent round-trip to the cluster; implementations hold no cache.
///
/// Lookups keyed by name or ID return `Ok(None)` when the target does not
/// exist instead of an error. Implementations must be safe to share across
/// async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait EtcdBackend: Send + Sync + 'static {
    // ── Cluster ──────────────────────────────────────────────────────

    /// Summary of the cluster as seen through the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the status call fails.
    async fn cluster_info(&self) -> Result<ClusterInfo, BackendError>;

    // ── Keys ─────────────────────────────────────────────────────────

    /// List every full key starting with `prefix` (keys only, in lexical
    /// order). An empty prefix lists the whole namespace.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the range scan fails.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BackendError>;

    /// Point lookup of a single key.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the range request fails.
    async fn get(&self, key: &str) -> Result<Option<KeyValue>, BackendError>;

    /// The lexically first record at or under `key` (prefix scan, limit 1).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the range request fails.
    async fn first_under(&self, key: &str) -> Result<Option<KeyValue>, BackendError>;

    /// Store a value, overwriting any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the put is rejected.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError>;

    /// Delete a single key. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the delete is rejected.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    // ── Auth ─────────────────────────────────────────────────────────

    /// Whether authentication is enabled on the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] only if the status cannot be determined.
    async fn auth_status(&self) -> Result<AuthStatus, BackendError>;

    /// All users with their granted roles.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if listing users fails.
    async fn users(&self) -> Result<Vec<User>, BackendError>;

    /// Create a user and grant it `roles`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the user exists or a role grant fails.
    async fn add_user(
        &self,
        name: &str,
        password: &str,
        roles: &[String],
    ) -> Result<User, BackendError>;

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the user does not exist or deletion fails.
    async fn delete_user(&self, name: &str) -> Result<(), BackendError>;

    /// Grant a role to a user. `Ok(None)` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the grant is rejected.
    async fn grant_user_role(&self, user: &str, role: &str)
    -> Result<Option<User>, BackendError>;

    /// Revoke a role from a user. `Ok(None)` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the revoke is rejected.
    async fn revoke_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, BackendError>;

    /// Replace a user's password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the user does not exist.
    async fn change_password(&self, user: &str, password: &str) -> Result<(), BackendError>;

    /// All roles with their permissions.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if listing roles fails.
    async fn roles(&self) -> Result<Vec<Role>, BackendError>;

    /// Create an empty role.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the role exists.
    async fn add_role(&self, name: &str) -> Result<Role, BackendError>;

    /// Delete a role.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the role does not exist.
    async fn delete_role(&self, name: &str) -> Result<(), BackendError>;

    /// Grant a permission to a role. `Ok(None)` if the role does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the grant is rejected.
    async fn grant_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, BackendError>;

    /// Revoke the permission covering `permission`'s key range.
    /// `Ok(None)` if the role does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the revoke is rejected.
    async fn revoke_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, BackendError>;

    // ── Leases ───────────────────────────────────────────────────────

    /// All leases with their TTLs and attached keys.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if listing leases fails.
    async fn leases(&self) -> Result<Vec<Lease>, BackendError>;

    /// Revoke a lease, deleting every key attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the lease does not exist.
    async fn revoke_lease(&self, id: LeaseId) -> Result<(), BackendError>;

    /// Send one keep-alive. `Ok(None)` if the lease does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the keep-alive stream fails.
    async fn keep_alive_lease(&self, id: LeaseId) -> Result<Option<Lease>, BackendError>;

    // ── Members ──────────────────────────────────────────────────────

    /// Current cluster membership.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the member list call fails.
    async fn members(&self) -> Result<Vec<Member>, BackendError>;

    /// Replace a member's peer URLs. `Ok(None)` if the member is gone.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the update is rejected.
    async fn update_member(
        &self,
        id: MemberId,
        peer_urls: &[String],
    ) -> Result<Option<Member>, BackendError>;

    /// Promote a learner to a voting member. `Ok(None)` if the member is gone.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the promotion is rejected.
    async fn promote_member(&self, id: MemberId) -> Result<Option<Member>, BackendError>;

    /// Remove a member from the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the member does not exist.
    async fn remove_member(&self, id: MemberId) -> Result<(), BackendError>;

    /// Transfer leadership to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the transfer is rejected.
    async fn move_leader(&self, target: MemberId) -> Result<(), BackendError>;

    // ── Alarms ───────────────────────────────────────────────────────

    /// Currently raised alarms.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the alarm call fails.
    async fn alarms(&self) -> Result<Vec<Alarm>, BackendError>;

    /// Disarm one alarm on one member.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the deactivate call fails.
    async fn disarm_alarm(&self, member: MemberId, alarm: AlarmType) -> Result<(), BackendError>;

    /// Disarm every raised alarm.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if any deactivate call fails.
    async fn disarm_all_alarms(&self) -> Result<(), BackendError>;

    // ── Endpoints ────────────────────────────────────────────────────

    /// Configured client endpoints, in configuration order.
    fn endpoints(&self) -> Vec<String>;

    /// Status of a single endpoint, queried against that endpoint only.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the endpoint is unreachable.
    async fn probe_endpoint(&self, endpoint: &str) -> Result<EndpointStatus, BackendError>;

    // ── Maintenance ──────────────────────────────────────────────────

    /// Defragment the backend database of every configured endpoint.
    /// Returns the number of endpoints defragmented.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on the first endpoint that fails.
    async fn defragment(&self) -> Result<usize, BackendError>;

    /// The current store revision.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the header cannot be fetched.
    async fn current_revision(&self) -> Result<i64, BackendError>;

    /// Compact the key history up to `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the revision is in the future or already
    /// compacted.
    async fn compact(&self, revision: i64) -> Result<(), BackendError>;

    /// Stream a point-in-time snapshot of the backend database to `dest`.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the file cannot be written, or any
    /// other variant if the snapshot stream fails.
    async fn snapshot(&self, dest: &Path) -> Result<u64, BackendError>;
}
