//! Live etcd backend.
//!
//! Talks to a real cluster over gRPC through `etcd-client`. The client
//! multiplexes over a shared channel, so each call clones it instead of
//! holding a lock.
//!
//! Feature-gated behind `live-backend`. TLS material is accepted as PEM
//! text and requires the `tls` feature.

use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

use etcd_client::{
    AlarmAction, AlarmOptions, Client, ConnectOptions, GetOptions, LeaseTimeToLiveOptions,
    RoleRevokePermissionOptions,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::types::{
    Alarm, AlarmType, AuthStatus, ClusterInfo, EndpointStatus, KeyValue, Lease, Member,
    Permission, PermissionType, Role, User,
};
use crate::{BackendError, EtcdBackend, LeaseId, MemberId};

/// PEM-encoded TLS material for client connections.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// CA bundle used to verify the server.
    pub ca_cert: Option<String>,
    /// Client certificate for mutual TLS.
    pub client_cert: Option<String>,
    /// Private key matching `client_cert`.
    pub client_key: Option<String>,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert", &self.ca_cert.as_ref().map(|_| "[PEM]"))
            .field("client_cert", &self.client_cert.as_ref().map(|_| "[PEM]"))
            .field("client_key", &self.client_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Connection settings for [`LiveBackend`].
#[derive(Clone)]
pub struct LiveConfig {
    pub endpoints: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub dial_timeout: Duration,
    pub tls: Option<TlsConfig>,
    /// Display name; etcd itself has no notion of a cluster name.
    pub cluster_name: String,
}

impl std::fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConfig")
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("dial_timeout", &self.dial_timeout)
            .field("tls", &self.tls)
            .field("cluster_name", &self.cluster_name)
            .finish()
    }
}

impl LiveConfig {
    fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }

    fn connect_options(&self) -> Result<ConnectOptions, BackendError> {
        let mut options = ConnectOptions::new().with_connect_timeout(self.dial_timeout);
        if let (Some(user), Some(password)) = (&self.username, &self.password) {
            if !user.is_empty() {
                options = options.with_user(user.clone(), password.clone());
            }
        }
        if let Some(tls) = &self.tls {
            options = apply_tls(options, tls)?;
        }
        Ok(options)
    }
}

#[cfg(feature = "tls")]
fn apply_tls(options: ConnectOptions, tls: &TlsConfig) -> Result<ConnectOptions, BackendError> {
    use etcd_client::{Certificate, Identity, TlsOptions};

    let mut tls_options = TlsOptions::new();
    if let Some(ca) = &tls.ca_cert {
        tls_options = tls_options.ca_certificate(Certificate::from_pem(ca));
    }
    match (&tls.client_cert, &tls.client_key) {
        (Some(cert), Some(key)) => {
            tls_options = tls_options.identity(Identity::from_pem(cert, key));
        }
        (None, None) => {}
        _ => {
            return Err(BackendError::Other {
                reason: "client certificate and key must be provided together".to_owned(),
            });
        }
    }
    Ok(options.with_tls(tls_options))
}

#[cfg(not(feature = "tls"))]
fn apply_tls(_options: ConnectOptions, _tls: &TlsConfig) -> Result<ConnectOptions, BackendError> {
    Err(BackendError::Other {
        reason: "TLS material configured but etcdash was built without the `tls` feature"
            .to_owned(),
    })
}

fn map_err(e: etcd_client::Error) -> BackendError {
    match e {
        etcd_client::Error::GRpcStatus(status) => BackendError::status(status.message()),
        etcd_client::Error::TransportError(e) => BackendError::Unavailable {
            reason: e.to_string(),
        },
        other => BackendError::Other {
            reason: other.to_string(),
        },
    }
}

/// Whether a server rejection means the named entity does not exist.
fn is_not_found(err: &BackendError, entity: &str) -> bool {
    matches!(err, BackendError::Status { message } if message.contains(&format!("{entity} not found")))
}

/// Decode a key, replacing invalid UTF-8 with U+FFFD. A lossy key will not
/// round-trip back to the stored record.
fn decode_key(raw: &[u8]) -> String {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(key) => key.to_owned(),
        Cow::Owned(key) => {
            debug!(raw = ?raw, decoded = %key, "key is not valid UTF-8, decoded lossily");
            key
        }
    }
}

fn convert_kv(kv: &etcd_client::KeyValue) -> KeyValue {
    KeyValue {
        key: decode_key(kv.key()),
        value: kv.value().to_vec(),
        create_revision: kv.create_revision(),
        mod_revision: kv.mod_revision(),
        version: kv.version(),
        lease: kv.lease(),
    }
}

fn convert_member(m: &etcd_client::Member) -> Member {
    Member {
        id: MemberId::new(m.id()).to_hex(),
        name: m.name().to_owned(),
        peer_urls: m.peer_urls().to_vec(),
        client_urls: m.client_urls().to_vec(),
        is_learner: m.is_learner(),
    }
}

/// The range end etcd uses for a prefix grant on `key`.
fn prefix_end(key: &[u8]) -> Vec<u8> {
    let mut end = key.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    vec![0]
}

fn convert_permission(p: &etcd_client::Permission) -> Permission {
    let key = p.key();
    let range_end = p.range_end();
    let prefix = !range_end.is_empty() && range_end == prefix_end(key).as_slice();
    Permission {
        perm_type: PermissionType::from_wire(p.get_type()),
        key: decode_key(key),
        range_end: (!range_end.is_empty() && !prefix).then(|| decode_key(range_end)),
        prefix: prefix.then_some(true),
    }
}

fn to_client_permission(p: &Permission) -> etcd_client::Permission {
    let base = match p.perm_type {
        PermissionType::Read => etcd_client::Permission::read(p.key.clone()),
        PermissionType::Write => etcd_client::Permission::write(p.key.clone()),
        PermissionType::ReadWrite => etcd_client::Permission::read_write(p.key.clone()),
    };
    match (&p.range_end, p.prefix) {
        (Some(end), _) => base.with_range_end(end.clone()),
        (None, Some(true)) => base.with_prefix(),
        _ => base,
    }
}

fn alarm_from_client(alarm: etcd_client::AlarmType) -> AlarmType {
    match alarm {
        etcd_client::AlarmType::Nospace => AlarmType::Nospace,
        etcd_client::AlarmType::Corrupt => AlarmType::Corrupt,
        etcd_client::AlarmType::None => AlarmType::None,
    }
}

fn alarm_to_client(alarm: AlarmType) -> etcd_client::AlarmType {
    match alarm {
        AlarmType::Nospace => etcd_client::AlarmType::Nospace,
        AlarmType::Corrupt => etcd_client::AlarmType::Corrupt,
        AlarmType::None => etcd_client::AlarmType::None,
    }
}

/// A backend connected to a real etcd cluster.
///
/// # Examples
///
/// ```no_run
/// # use std::time::Duration;
/// # use etcdash_backend::{LiveBackend, LiveConfig};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = LiveBackend::connect(LiveConfig {
///     endpoints: vec!["http://127.0.0.1:2379".to_owned()],
///     username: None,
///     password: None,
///     dial_timeout: Duration::from_secs(3),
///     tls: None,
///     cluster_name: "etcd-cluster".to_owned(),
/// })
/// .await
/// .unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct LiveBackend {
    client: Client,
    config: LiveConfig,
}

impl std::fmt::Debug for LiveBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBackend")
            .field("client", &"[etcd_client::Client]")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LiveBackend {
    /// Connect to the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if no endpoint can be reached,
    /// or [`BackendError::Status`] if authentication is rejected.
    pub async fn connect(config: LiveConfig) -> Result<Self, BackendError> {
        let client = Client::connect(&config.endpoints, Some(config.connect_options()?))
            .await
            .map_err(map_err)?;
        debug!(endpoints = ?config.endpoints, "connected to etcd");
        Ok(Self { client, config })
    }

    async fn connect_single(&self, endpoint: &str) -> Result<Client, BackendError> {
        Client::connect([endpoint], Some(self.config.connect_options()?))
            .await
            .map_err(map_err)
    }

    async fn user(&self, name: &str) -> Result<User, BackendError> {
        let resp = self.client.clone().user_get(name).await.map_err(map_err)?;
        Ok(User {
            name: name.to_owned(),
            roles: resp.roles().to_vec(),
        })
    }

    async fn role(&self, name: &str) -> Result<Role, BackendError> {
        let resp = self.client.clone().role_get(name).await.map_err(map_err)?;
        Ok(Role {
            name: name.to_owned(),
            permissions: resp.permissions().iter().map(convert_permission).collect(),
        })
    }

    /// Fetch one lease with its attached keys. `Ok(None)` if it has expired.
    async fn lease(&self, id: i64) -> Result<Option<Lease>, BackendError> {
        let resp = self
            .client
            .clone()
            .lease_time_to_live(id, Some(LeaseTimeToLiveOptions::new().with_keys()))
            .await
            .map_err(map_err)?;
        if resp.ttl() < 0 {
            return Ok(None);
        }
        Ok(Some(Lease {
            id: LeaseId::new(id).to_hex(),
            ttl: resp.ttl(),
            granted_ttl: resp.granted_ttl(),
            keys: resp
                .keys()
                .iter()
                .map(|k| decode_key(k))
                .collect(),
        }))
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>, BackendError> {
        Ok(self
            .members()
            .await?
            .into_iter()
            .find(|m| m.id == id.to_hex()))
    }
}

#[async_trait::async_trait]
impl EtcdBackend for LiveBackend {
    async fn cluster_info(&self) -> Result<ClusterInfo, BackendError> {
        let resp = self.client.clone().status().await.map_err(map_err)?;
        let revision = resp.header().map_or(0, etcd_client::ResponseHeader::revision);
        Ok(ClusterInfo {
            version: resp.version().to_owned(),
            cluster_name: self.config.cluster_name.clone(),
            endpoints: self.config.endpoints.clone(),
            leader: MemberId::new(resp.leader()).to_hex(),
            revision,
            raft_term: resp.raft_term(),
        })
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let options = if prefix.is_empty() {
            GetOptions::new().with_all_keys().with_keys_only()
        } else {
            GetOptions::new().with_prefix().with_keys_only()
        };
        let resp = self
            .client
            .clone()
            .get(prefix, Some(options))
            .await
            .map_err(map_err)?;
        Ok(resp
            .kvs()
            .iter()
            .map(|kv| decode_key(kv.key()))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<KeyValue>, BackendError> {
        let resp = self.client.clone().get(key, None).await.map_err(map_err)?;
        Ok(resp.kvs().first().map(convert_kv))
    }

    async fn first_under(&self, key: &str) -> Result<Option<KeyValue>, BackendError> {
        let resp = self
            .client
            .clone()
            .get(key, Some(GetOptions::new().with_prefix().with_limit(1)))
            .await
            .map_err(map_err)?;
        Ok(resp.kvs().first().map(convert_kv))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        self.client
            .clone()
            .put(key, value.to_vec(), None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.client
            .clone()
            .delete(key, None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn auth_status(&self) -> Result<AuthStatus, BackendError> {
        // Authenticated connections only succeed when auth is on.
        if self.config.has_credentials() {
            return Ok(AuthStatus { enabled: true });
        }
        let enabled = match self.client.clone().user_list().await.map_err(map_err) {
            Ok(_) => false,
            Err(e) if e.message().contains("authentication is not enabled") => false,
            Err(BackendError::Status { message }) => {
                debug!(%message, "user list rejected, treating auth as enabled");
                true
            }
            Err(e) => return Err(e),
        };
        Ok(AuthStatus { enabled })
    }

    async fn users(&self) -> Result<Vec<User>, BackendError> {
        let names = self.client.clone().user_list().await.map_err(map_err)?;
        let mut users = Vec::with_capacity(names.users().len());
        for name in names.users() {
            users.push(self.user(name).await?);
        }
        Ok(users)
    }

    async fn add_user(
        &self,
        name: &str,
        password: &str,
        roles: &[String],
    ) -> Result<User, BackendError> {
        let mut client = self.client.clone();
        client
            .user_add(name, password, None)
            .await
            .map_err(map_err)?;
        for role in roles {
            client.user_grant_role(name, role.as_str()).await.map_err(map_err)?;
        }
        self.user(name).await
    }

    async fn delete_user(&self, name: &str) -> Result<(), BackendError> {
        self.client
            .clone()
            .user_delete(name)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn grant_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, BackendError> {
        match self.client.clone().user_grant_role(user, role).await.map_err(map_err) {
            Ok(_) => self.user(user).await.map(Some),
            Err(e) if is_not_found(&e, "user name") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn revoke_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, BackendError> {
        match self.client.clone().user_revoke_role(user, role).await.map_err(map_err) {
            Ok(_) => self.user(user).await.map(Some),
            Err(e) if is_not_found(&e, "user name") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn change_password(&self, user: &str, password: &str) -> Result<(), BackendError> {
        self.client
            .clone()
            .user_change_password(user, password)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn roles(&self) -> Result<Vec<Role>, BackendError> {
        let names = self.client.clone().role_list().await.map_err(map_err)?;
        let mut roles = Vec::with_capacity(names.roles().len());
        for name in names.roles() {
            roles.push(self.role(name).await?);
        }
        Ok(roles)
    }

    async fn add_role(&self, name: &str) -> Result<Role, BackendError> {
        self.client.clone().role_add(name).await.map_err(map_err)?;
        Ok(Role {
            name: name.to_owned(),
            permissions: Vec::new(),
        })
    }

    async fn delete_role(&self, name: &str) -> Result<(), BackendError> {
        self.client
            .clone()
            .role_delete(name)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn grant_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, BackendError> {
        let result = self
            .client
            .clone()
            .role_grant_permission(role, to_client_permission(permission))
            .await
            .map_err(map_err);
        match result {
            Ok(_) => self.role(role).await.map(Some),
            Err(e) if is_not_found(&e, "role name") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn revoke_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, BackendError> {
        let options = match (&permission.range_end, permission.prefix) {
            (Some(end), _) => Some(RoleRevokePermissionOptions::new().with_range_end(end.clone())),
            (None, Some(true)) => Some(RoleRevokePermissionOptions::new().with_prefix()),
            _ => None,
        };
        let result = self
            .client
            .clone()
            .role_revoke_permission(role, permission.key.clone(), options)
            .await
            .map_err(map_err);
        match result {
            Ok(_) => self.role(role).await.map(Some),
            Err(e) if is_not_found(&e, "role name") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn leases(&self) -> Result<Vec<Lease>, BackendError> {
        let resp = self.client.clone().leases().await.map_err(map_err)?;
        let mut leases = Vec::with_capacity(resp.leases().len());
        for status in resp.leases() {
            // A lease can expire between the listing and the lookup.
            if let Some(lease) = self.lease(status.id()).await? {
                leases.push(lease);
            }
        }
        Ok(leases)
    }

    async fn revoke_lease(&self, id: LeaseId) -> Result<(), BackendError> {
        self.client
            .clone()
            .lease_revoke(id.get())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn keep_alive_lease(&self, id: LeaseId) -> Result<Option<Lease>, BackendError> {
        if self.lease(id.get()).await?.is_none() {
            return Ok(None);
        }

        let (mut keeper, mut stream) = self
            .client
            .clone()
            .lease_keep_alive(id.get())
            .await
            .map_err(map_err)?;
        keeper.keep_alive().await.map_err(map_err)?;
        match stream.message().await.map_err(map_err)? {
            Some(resp) if resp.ttl() > 0 => self.lease(id.get()).await,
            _ => Ok(None),
        }
    }

    async fn members(&self) -> Result<Vec<Member>, BackendError> {
        let resp = self.client.clone().member_list().await.map_err(map_err)?;
        Ok(resp.members().iter().map(convert_member).collect())
    }

    async fn update_member(
        &self,
        id: MemberId,
        peer_urls: &[String],
    ) -> Result<Option<Member>, BackendError> {
        let result = self
            .client
            .clone()
            .member_update(id.get(), peer_urls.to_vec())
            .await
            .map_err(map_err);
        match result {
            Ok(_) => self.find_member(id).await,
            Err(e) if is_not_found(&e, "member") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn promote_member(&self, id: MemberId) -> Result<Option<Member>, BackendError> {
        let result = self
            .client
            .clone()
            .member_promote(id.get())
            .await
            .map_err(map_err);
        match result {
            Ok(_) => self.find_member(id).await,
            Err(e) if is_not_found(&e, "member") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn remove_member(&self, id: MemberId) -> Result<(), BackendError> {
        self.client
            .clone()
            .member_remove(id.get())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn move_leader(&self, target: MemberId) -> Result<(), BackendError> {
        self.client
            .clone()
            .move_leader(target.get())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn alarms(&self) -> Result<Vec<Alarm>, BackendError> {
        let resp = self
            .client
            .clone()
            .alarm(AlarmAction::Get, etcd_client::AlarmType::None, None)
            .await
            .map_err(map_err)?;
        Ok(resp
            .alarms()
            .iter()
            .map(|a| Alarm {
                member_id: MemberId::new(a.member_id()).to_hex(),
                alarm: alarm_from_client(a.alarm()),
            })
            .collect())
    }

    async fn disarm_alarm(&self, member: MemberId, alarm: AlarmType) -> Result<(), BackendError> {
        let mut options = AlarmOptions::new();
        options.with_member(member.get());
        self.client
            .clone()
            .alarm(
                AlarmAction::Deactivate,
                alarm_to_client(alarm),
                Some(options),
            )
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn disarm_all_alarms(&self) -> Result<(), BackendError> {
        for alarm in self.alarms().await? {
            let member = MemberId::parse_hex(&alarm.member_id)?;
            self.disarm_alarm(member, alarm.alarm).await?;
        }
        Ok(())
    }

    fn endpoints(&self) -> Vec<String> {
        self.config.endpoints.clone()
    }

    async fn probe_endpoint(&self, endpoint: &str) -> Result<EndpointStatus, BackendError> {
        let resp = self
            .connect_single(endpoint)
            .await?
            .status()
            .await
            .map_err(map_err)?;
        Ok(EndpointStatus {
            endpoint: endpoint.to_owned(),
            db_size: resp.db_size(),
            db_size_in_use: resp.raft_used_db_size(),
            leader: MemberId::new(resp.leader()).to_hex(),
            raft_index: resp.raft_index(),
            raft_term: resp.raft_term(),
            raft_applied_index: resp.raft_applied_index(),
            version: resp.version().to_owned(),
        })
    }

    async fn defragment(&self) -> Result<usize, BackendError> {
        for endpoint in &self.config.endpoints {
            let mut client = self.connect_single(endpoint).await?;
            client.defragment().await.map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "defragment failed");
                map_err(e)
            })?;
            debug!(endpoint = %endpoint, "defragmented");
        }
        Ok(self.config.endpoints.len())
    }

    async fn current_revision(&self) -> Result<i64, BackendError> {
        let resp = self.client.clone().status().await.map_err(map_err)?;
        resp.header()
            .map(etcd_client::ResponseHeader::revision)
            .ok_or_else(|| BackendError::Other {
                reason: "status response carried no header".to_owned(),
            })
    }

    async fn compact(&self, revision: i64) -> Result<(), BackendError> {
        self.client
            .clone()
            .compact(revision, None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn snapshot(&self, dest: &Path) -> Result<u64, BackendError> {
        let io_err = |e: std::io::Error| BackendError::Io {
            path: dest.display().to_string(),
            reason: e.to_string(),
        };

        let mut stream = self.client.clone().snapshot().await.map_err(map_err)?;
        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut written: u64 = 0;
        while let Some(chunk) = stream.message().await.map_err(map_err)? {
            file.write_all(chunk.blob()).await.map_err(io_err)?;
            written += chunk.blob().len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        Ok(written)
    }
}
