//! In-memory etcd backend for mock mode and tests.
//!
//! Holds a whole fake cluster (flat key namespace with revisions, auth,
//! leases, membership, alarms) behind a single `RwLock`. Nothing
//! persists and there are no transactions: concurrent writers simply win in
//! the order they take the lock.
//!
//! Server-side rejections reuse etcd's own error text so that the console's
//! error normalization treats both backends identically.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{
    Alarm, AlarmType, AuthStatus, ClusterInfo, EndpointStatus, KeyValue, Lease, Member,
    Permission, PermissionType, Role, User,
};
use crate::{BackendError, EtcdBackend, LeaseId, MemberId};

/// Version string reported by the fake cluster.
const MOCK_VERSION: &str = "3.5.17";

/// Baseline database size reported before any keys are counted.
const BASE_DB_SIZE: i64 = 24_576;

/// A key-value read that [`MemoryBackend::fail_reads`] can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KvRead {
    /// Prefix scans: `list_keys` and `first_under`.
    Scan,
    /// Point lookups: `get`.
    Get,
}

/// Settings for the in-memory cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Display cluster name.
    pub cluster_name: String,
    /// Client endpoints reported by the cluster and accepted by probes.
    pub endpoints: Vec<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cluster_name: "etcd-cluster".to_owned(),
            endpoints: vec![
                "http://etcd-1:2379".to_owned(),
                "http://etcd-2:2379".to_owned(),
                "http://etcd-3:2379".to_owned(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    value: Vec<u8>,
    create_revision: i64,
    mod_revision: i64,
    version: i64,
    lease: i64,
}

#[derive(Debug, Clone)]
struct LeaseState {
    granted_ttl: i64,
    ttl: i64,
}

#[derive(Debug, Clone)]
struct UserState {
    password: String,
    roles: Vec<String>,
}

#[derive(Debug, Clone)]
struct State {
    keys: BTreeMap<String, Record>,
    revision: i64,
    compacted: i64,
    users: BTreeMap<String, UserState>,
    roles: BTreeMap<String, Vec<Permission>>,
    leases: BTreeMap<i64, LeaseState>,
    members: Vec<(MemberId, Member)>,
    leader: MemberId,
    raft_term: u64,
    alarms: Vec<(MemberId, AlarmType)>,
    auth_enabled: bool,
    unreachable: BTreeSet<String>,
    failing_reads: BTreeSet<KvRead>,
}

impl State {
    /// A single-member cluster with an empty namespace and auth disabled.
    fn empty(config: &DemoConfig) -> Self {
        let id = MemberId::new(0x8e9e_05c5_2164_694d);
        let client_urls = config.endpoints.first().cloned().into_iter().collect();
        Self {
            keys: BTreeMap::new(),
            revision: 1,
            compacted: 0,
            users: BTreeMap::new(),
            roles: BTreeMap::new(),
            leases: BTreeMap::new(),
            members: vec![(
                id,
                Member {
                    id: id.to_hex(),
                    name: "default".to_owned(),
                    peer_urls: vec!["http://127.0.0.1:2380".to_owned()],
                    client_urls,
                    is_learner: false,
                },
            )],
            leader: id,
            raft_term: 2,
            alarms: Vec::new(),
            auth_enabled: false,
            unreachable: BTreeSet::new(),
            failing_reads: BTreeSet::new(),
        }
    }

    /// A three-member demo cluster with sample keys, auth, leases, and an alarm.
    fn demo(config: &DemoConfig) -> Self {
        let mut state = Self::empty(config);
        state.raft_term = 5;
        state.auth_enabled = true;

        let member = |raw: u64, n: u8, learner: bool| {
            let id = MemberId::new(raw);
            (
                id,
                Member {
                    id: id.to_hex(),
                    name: format!("etcd-{n}"),
                    peer_urls: vec![format!("http://etcd-{n}:2380")],
                    client_urls: vec![format!("http://etcd-{n}:2379")],
                    is_learner: learner,
                },
            )
        };
        state.members = vec![
            member(0x8e9e_05c5_2164_694d, 1, false),
            member(0x91bc_3c39_8fb3_c146, 2, false),
            member(0xfd42_2379_fda5_0e48, 3, true),
        ];
        state.leader = state.members[0].0;

        state.roles.insert("root".to_owned(), Vec::new());
        state.roles.insert(
            "reader".to_owned(),
            vec![Permission {
                perm_type: PermissionType::Read,
                key: "/config/".to_owned(),
                range_end: None,
                prefix: Some(true),
            }],
        );
        state.roles.insert(
            "writer".to_owned(),
            vec![Permission {
                perm_type: PermissionType::ReadWrite,
                key: "/app/".to_owned(),
                range_end: None,
                prefix: Some(true),
            }],
        );

        for (name, roles) in [
            ("root", vec!["root"]),
            ("app-reader", vec!["reader"]),
            ("app-writer", vec!["reader", "writer"]),
        ] {
            state.users.insert(
                name.to_owned(),
                UserState {
                    password: format!("{name}-password"),
                    roles: roles.into_iter().map(str::to_owned).collect(),
                },
            );
        }

        let session_lease = 0x694d_7a3b_0e1c_2f01;
        let lock_lease = 0x694d_7a3b_0e1c_2f02;
        state.leases.insert(
            session_lease,
            LeaseState {
                granted_ttl: 300,
                ttl: 271,
            },
        );
        state.leases.insert(
            lock_lease,
            LeaseState {
                granted_ttl: 60,
                ttl: 42,
            },
        );

        for (key, value, lease) in [
            ("/config/db/host", "10.0.0.10", 0),
            ("/config/db/port", "5432", 0),
            ("/config/flag", "true", 0),
            ("/config/features/", "", 0),
            ("/app/services/api/replicas", "3", 0),
            ("/app/services/web/replicas", "2", 0),
            ("/app/settings", r#"{"theme":"dark","maxUploadMb":50}"#, 0),
            ("/app/sessions/7f3a", "user=alice", session_lease),
            ("/locks/scheduler", "etcd-1", lock_lease),
            ("registry/nodes/node-1", "10.0.1.1", 0),
        ] {
            state.write(key, value.as_bytes(), lease);
        }

        state.alarms.push((state.members[1].0, AlarmType::Nospace));
        state
    }

    fn write(&mut self, key: &str, value: &[u8], lease: i64) {
        self.revision += 1;
        let revision = self.revision;
        self.keys
            .entry(key.to_owned())
            .and_modify(|r| {
                r.value = value.to_vec();
                r.mod_revision = revision;
                r.version += 1;
                r.lease = lease;
            })
            .or_insert_with(|| Record {
                value: value.to_vec(),
                create_revision: revision,
                mod_revision: revision,
                version: 1,
                lease,
            });
    }

    fn key_value(key: &str, record: &Record) -> KeyValue {
        KeyValue {
            key: key.to_owned(),
            value: record.value.clone(),
            create_revision: record.create_revision,
            mod_revision: record.mod_revision,
            version: record.version,
            lease: record.lease,
        }
    }

    fn user(&self, name: &str) -> Option<User> {
        self.users.get(name).map(|u| User {
            name: name.to_owned(),
            roles: u.roles.clone(),
        })
    }

    fn role(&self, name: &str) -> Option<Role> {
        self.roles.get(name).map(|permissions| Role {
            name: name.to_owned(),
            permissions: permissions.clone(),
        })
    }

    fn lease(&self, id: i64) -> Option<Lease> {
        self.leases.get(&id).map(|l| Lease {
            id: LeaseId::new(id).to_hex(),
            ttl: l.ttl,
            granted_ttl: l.granted_ttl,
            keys: self
                .keys
                .iter()
                .filter(|(_, r)| r.lease == id)
                .map(|(k, _)| k.clone())
                .collect(),
        })
    }

    fn member_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|(mid, _)| *mid == id)
            .map(|(_, m)| m)
    }

    fn db_size(&self) -> i64 {
        let used: usize = self.keys.iter().map(|(k, r)| k.len() + r.value.len()).sum();
        BASE_DB_SIZE + i64::try_from(used).unwrap_or(i64::MAX - BASE_DB_SIZE)
    }
}

/// Serialized form written by [`MemoryBackend::snapshot`].
#[derive(Serialize)]
struct SnapshotFile<'a> {
    cluster_name: &'a str,
    revision: i64,
    keys: BTreeMap<&'a str, String>,
}

/// An in-memory etcd cluster.
///
/// Cheap to clone; clones share state. Construct with [`MemoryBackend::new`]
/// for an empty single-member cluster or [`MemoryBackend::demo`] for a
/// seeded one, and return to that initial state with [`MemoryBackend::reset`].
///
/// # Examples
///
/// ```
/// # use etcdash_backend::{EtcdBackend, MemoryBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// backend.put("/config/flag", b"true").await.unwrap();
/// let keys = backend.list_keys("/config/").await.unwrap();
/// assert_eq!(keys, vec!["/config/flag"]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
    config: DemoConfig,
    seeded: bool,
}

impl MemoryBackend {
    /// An empty single-member cluster with auth disabled.
    #[must_use]
    pub fn new() -> Self {
        let config = DemoConfig {
            endpoints: vec!["http://127.0.0.1:2379".to_owned()],
            ..DemoConfig::default()
        };
        Self {
            state: Arc::new(RwLock::new(State::empty(&config))),
            config,
            seeded: false,
        }
    }

    /// A seeded three-member demo cluster.
    #[must_use]
    pub fn demo(config: DemoConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::demo(&config))),
            config,
            seeded: true,
        }
    }

    /// Discard every change and return to the initial state.
    pub async fn reset(&self) {
        let fresh = if self.seeded {
            State::demo(&self.config)
        } else {
            State::empty(&self.config)
        };
        *self.state.write().await = fresh;
    }

    /// Make probes and maintenance calls against `endpoint` fail as if the
    /// endpoint were down.
    pub async fn set_unreachable(&self, endpoint: &str, unreachable: bool) {
        let mut state = self.state.write().await;
        if unreachable {
            state.unreachable.insert(endpoint.to_owned());
        } else {
            state.unreachable.remove(endpoint);
        }
    }

    /// Make every `read` of the key space fail as if the cluster were down.
    pub async fn fail_reads(&self, read: KvRead, failing: bool) {
        let mut state = self.state.write().await;
        if failing {
            state.failing_reads.insert(read);
        } else {
            state.failing_reads.remove(&read);
        }
    }

    /// Raise an alarm on a member.
    pub async fn raise_alarm(&self, member: MemberId, alarm: AlarmType) {
        let mut state = self.state.write().await;
        if !state.alarms.contains(&(member, alarm)) {
            state.alarms.push((member, alarm));
        }
    }

    /// Grant a lease and attach `keys` to it, creating them with empty
    /// values if they do not exist.
    pub async fn grant_lease(&self, id: LeaseId, ttl: i64, keys: &[&str]) {
        let mut state = self.state.write().await;
        state.leases.insert(
            id.get(),
            LeaseState {
                granted_ttl: ttl,
                ttl,
            },
        );
        for key in keys {
            let value = state
                .keys
                .get(*key)
                .map(|r| r.value.clone())
                .unwrap_or_default();
            state.write(key, &value, id.get());
        }
    }

    /// Enable or disable authentication.
    pub async fn set_auth_enabled(&self, enabled: bool) {
        self.state.write().await.auth_enabled = enabled;
    }

    fn check_reachable(state: &State, endpoint: &str) -> Result<(), BackendError> {
        if state.unreachable.contains(endpoint) {
            return Err(BackendError::Unavailable {
                reason: format!("connection refused: {endpoint}"),
            });
        }
        Ok(())
    }

    fn check_read(state: &State, read: KvRead) -> Result<(), BackendError> {
        if state.failing_reads.contains(&read) {
            return Err(BackendError::Unavailable {
                reason: format!("connection refused during {read:?} read"),
            });
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EtcdBackend for MemoryBackend {
    async fn cluster_info(&self) -> Result<ClusterInfo, BackendError> {
        let state = self.state.read().await;
        Ok(ClusterInfo {
            version: MOCK_VERSION.to_owned(),
            cluster_name: self.config.cluster_name.clone(),
            endpoints: self.config.endpoints.clone(),
            leader: state.leader.to_hex(),
            revision: state.revision,
            raft_term: state.raft_term,
        })
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let state = self.state.read().await;
        Self::check_read(&state, KvRead::Scan)?;
        let keys = state
            .keys
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<KeyValue>, BackendError> {
        let state = self.state.read().await;
        Self::check_read(&state, KvRead::Get)?;
        Ok(state.keys.get(key).map(|r| State::key_value(key, r)))
    }

    async fn first_under(&self, key: &str) -> Result<Option<KeyValue>, BackendError> {
        let state = self.state.read().await;
        Self::check_read(&state, KvRead::Scan)?;
        let first = state
            .keys
            .range(key.to_owned()..)
            .take_while(|(k, _)| k.starts_with(key))
            .next()
            .map(|(k, r)| State::key_value(k, r));
        Ok(first)
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        if key.is_empty() {
            return Err(BackendError::status("etcdserver: key is not provided"));
        }
        self.state.write().await.write(key, value, 0);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        if state.keys.remove(key).is_some() {
            state.revision += 1;
        }
        Ok(())
    }

    async fn auth_status(&self) -> Result<AuthStatus, BackendError> {
        Ok(AuthStatus {
            enabled: self.state.read().await.auth_enabled,
        })
    }

    async fn users(&self) -> Result<Vec<User>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .map(|(name, u)| User {
                name: name.clone(),
                roles: u.roles.clone(),
            })
            .collect())
    }

    async fn add_user(
        &self,
        name: &str,
        password: &str,
        roles: &[String],
    ) -> Result<User, BackendError> {
        let mut state = self.state.write().await;
        if state.users.contains_key(name) {
            return Err(BackendError::status("etcdserver: user name already exists"));
        }
        if roles.iter().any(|r| !state.roles.contains_key(r)) {
            return Err(BackendError::status("etcdserver: role name not found"));
        }

        let mut granted: Vec<String> = Vec::with_capacity(roles.len());
        for role in roles {
            if !granted.contains(role) {
                granted.push(role.clone());
            }
        }
        state.users.insert(
            name.to_owned(),
            UserState {
                password: password.to_owned(),
                roles: granted.clone(),
            },
        );
        Ok(User {
            name: name.to_owned(),
            roles: granted,
        })
    }

    async fn delete_user(&self, name: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state
            .users
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::status("etcdserver: user name not found"))
    }

    async fn grant_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, BackendError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(user) {
            return Ok(None);
        }
        if !state.roles.contains_key(role) {
            return Err(BackendError::status("etcdserver: role name not found"));
        }
        if let Some(u) = state.users.get_mut(user) {
            if !u.roles.iter().any(|r| r == role) {
                u.roles.push(role.to_owned());
            }
        }
        Ok(state.user(user))
    }

    async fn revoke_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, BackendError> {
        let mut state = self.state.write().await;
        let Some(u) = state.users.get_mut(user) else {
            return Ok(None);
        };
        let before = u.roles.len();
        u.roles.retain(|r| r != role);
        if u.roles.len() == before {
            return Err(BackendError::status(
                "etcdserver: role is not granted to the user",
            ));
        }
        Ok(state.user(user))
    }

    async fn change_password(&self, user: &str, password: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let u = state
            .users
            .get_mut(user)
            .ok_or_else(|| BackendError::status("etcdserver: user name not found"))?;
        u.password = password.to_owned();
        debug!(user, "mock password changed");
        Ok(())
    }

    async fn roles(&self) -> Result<Vec<Role>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .map(|(name, permissions)| Role {
                name: name.clone(),
                permissions: permissions.clone(),
            })
            .collect())
    }

    async fn add_role(&self, name: &str) -> Result<Role, BackendError> {
        let mut state = self.state.write().await;
        if state.roles.contains_key(name) {
            return Err(BackendError::status("etcdserver: role name already exists"));
        }
        state.roles.insert(name.to_owned(), Vec::new());
        Ok(Role {
            name: name.to_owned(),
            permissions: Vec::new(),
        })
    }

    async fn delete_role(&self, name: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        if state.roles.remove(name).is_none() {
            return Err(BackendError::status("etcdserver: role name not found"));
        }
        for user in state.users.values_mut() {
            user.roles.retain(|r| r != name);
        }
        Ok(())
    }

    async fn grant_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, BackendError> {
        let mut state = self.state.write().await;
        let Some(permissions) = state.roles.get_mut(role) else {
            return Ok(None);
        };
        match permissions.iter_mut().find(|p| p.same_range(permission)) {
            Some(existing) => existing.perm_type = permission.perm_type,
            None => permissions.push(permission.clone()),
        }
        Ok(state.role(role))
    }

    async fn revoke_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, BackendError> {
        let mut state = self.state.write().await;
        let Some(permissions) = state.roles.get_mut(role) else {
            return Ok(None);
        };
        let before = permissions.len();
        permissions.retain(|p| !p.same_range(permission));
        if permissions.len() == before {
            return Err(BackendError::status(
                "etcdserver: permission is not granted to the role",
            ));
        }
        Ok(state.role(role))
    }

    async fn leases(&self) -> Result<Vec<Lease>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .leases
            .keys()
            .filter_map(|id| state.lease(*id))
            .collect())
    }

    async fn revoke_lease(&self, id: LeaseId) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        if state.leases.remove(&id.get()).is_none() {
            return Err(BackendError::status("etcdserver: requested lease not found"));
        }
        let before = state.keys.len();
        state.keys.retain(|_, r| r.lease != id.get());
        if state.keys.len() != before {
            state.revision += 1;
        }
        Ok(())
    }

    async fn keep_alive_lease(&self, id: LeaseId) -> Result<Option<Lease>, BackendError> {
        let mut state = self.state.write().await;
        let Some(lease) = state.leases.get_mut(&id.get()) else {
            return Ok(None);
        };
        lease.ttl = lease.granted_ttl;
        Ok(state.lease(id.get()))
    }

    async fn members(&self) -> Result<Vec<Member>, BackendError> {
        let state = self.state.read().await;
        Ok(state.members.iter().map(|(_, m)| m.clone()).collect())
    }

    async fn update_member(
        &self,
        id: MemberId,
        peer_urls: &[String],
    ) -> Result<Option<Member>, BackendError> {
        let mut state = self.state.write().await;
        Ok(state.member_mut(id).map(|m| {
            m.peer_urls = peer_urls.to_vec();
            m.clone()
        }))
    }

    async fn promote_member(&self, id: MemberId) -> Result<Option<Member>, BackendError> {
        let mut state = self.state.write().await;
        let Some(member) = state.member_mut(id) else {
            return Ok(None);
        };
        if !member.is_learner {
            return Err(BackendError::status(
                "etcdserver: can only promote a learner member",
            ));
        }
        member.is_learner = false;
        Ok(Some(member.clone()))
    }

    async fn remove_member(&self, id: MemberId) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let before = state.members.len();
        state.members.retain(|(mid, _)| *mid != id);
        if state.members.len() == before {
            return Err(BackendError::status("etcdserver: member not found"));
        }
        state.alarms.retain(|(mid, _)| *mid != id);

        if state.leader == id {
            let next = state
                .members
                .iter()
                .find(|(_, m)| !m.is_learner)
                .map(|(mid, _)| *mid);
            if let Some(next) = next {
                state.leader = next;
                state.raft_term += 1;
            }
        }
        Ok(())
    }

    async fn move_leader(&self, target: MemberId) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let Some((_, member)) = state.members.iter().find(|(mid, _)| *mid == target) else {
            return Err(BackendError::status("etcdserver: member not found"));
        };
        if member.is_learner {
            return Err(BackendError::status("etcdserver: bad leader transferee"));
        }
        if state.leader != target {
            state.leader = target;
            state.raft_term += 1;
        }
        Ok(())
    }

    async fn alarms(&self) -> Result<Vec<Alarm>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .alarms
            .iter()
            .map(|(member, alarm)| Alarm {
                member_id: member.to_hex(),
                alarm: *alarm,
            })
            .collect())
    }

    async fn disarm_alarm(&self, member: MemberId, alarm: AlarmType) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state
            .alarms
            .retain(|(mid, a)| *mid != member || (alarm != AlarmType::None && *a != alarm));
        Ok(())
    }

    async fn disarm_all_alarms(&self) -> Result<(), BackendError> {
        self.state.write().await.alarms.clear();
        Ok(())
    }

    fn endpoints(&self) -> Vec<String> {
        self.config.endpoints.clone()
    }

    async fn probe_endpoint(&self, endpoint: &str) -> Result<EndpointStatus, BackendError> {
        let state = self.state.read().await;
        Self::check_reachable(&state, endpoint)?;
        if !self.config.endpoints.iter().any(|e| e == endpoint) {
            return Err(BackendError::Unavailable {
                reason: format!("unknown endpoint: {endpoint}"),
            });
        }

        let db_size = state.db_size();
        let raft_index = u64::try_from(state.revision).unwrap_or_default() + 8;
        Ok(EndpointStatus {
            endpoint: endpoint.to_owned(),
            db_size,
            db_size_in_use: db_size - BASE_DB_SIZE / 2,
            leader: state.leader.to_hex(),
            raft_index,
            raft_term: state.raft_term,
            raft_applied_index: raft_index,
            version: MOCK_VERSION.to_owned(),
        })
    }

    async fn defragment(&self) -> Result<usize, BackendError> {
        let state = self.state.read().await;
        for endpoint in &self.config.endpoints {
            Self::check_reachable(&state, endpoint)?;
        }
        Ok(self.config.endpoints.len())
    }

    async fn current_revision(&self) -> Result<i64, BackendError> {
        Ok(self.state.read().await.revision)
    }

    async fn compact(&self, revision: i64) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        if revision > state.revision {
            return Err(BackendError::status(
                "etcdserver: mvcc: required revision is a future revision",
            ));
        }
        if revision <= state.compacted {
            return Err(BackendError::status(
                "etcdserver: mvcc: required revision has been compacted",
            ));
        }
        state.compacted = revision;
        Ok(())
    }

    async fn snapshot(&self, dest: &Path) -> Result<u64, BackendError> {
        let bytes = {
            let state = self.state.read().await;
            let file = SnapshotFile {
                cluster_name: &self.config.cluster_name,
                revision: state.revision,
                keys: state
                    .keys
                    .iter()
                    .map(|(k, r)| (k.as_str(), String::from_utf8_lossy(&r.value).into_owned()))
                    .collect(),
            };
            serde_json::to_vec_pretty(&file).map_err(|e| BackendError::Other {
                reason: format!("snapshot serialization failed: {e}"),
            })?
        };

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| BackendError::Io {
                path: dest.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes.len() as u64)
    }
}
