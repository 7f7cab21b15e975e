//! Entity types exchanged between the console and a backend.
//!
//! These mirror what etcd exposes through its client API, flattened into
//! plain owned structs with display-friendly identifiers. Field names
//! serialize in camelCase because they are handed straight to the web UI.

use serde::{Deserialize, Serialize};

/// A raw key-value record as stored in etcd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Full key path.
    pub key: String,
    /// Opaque value bytes.
    pub value: Vec<u8>,
    /// Revision of the last creation of this key.
    pub create_revision: i64,
    /// Revision of the last modification of this key.
    pub mod_revision: i64,
    /// Number of modifications since creation.
    pub version: i64,
    /// Attached lease (`0` when none).
    pub lease: i64,
}

/// A node in the projected key hierarchy.
///
/// Directories are synthetic and never carry revision metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    /// Display segment (not the full path). Directory names end with `/`.
    pub key: String,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_revision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_revision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Key {
    /// A synthetic directory entry.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            key: name.into(),
            is_directory: true,
            revision: None,
            create_revision: None,
            mod_revision: None,
            value: None,
        }
    }

    /// A leaf entry without metadata.
    #[must_use]
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            key: name.into(),
            is_directory: false,
            revision: None,
            create_revision: None,
            mod_revision: None,
            value: None,
        }
    }

    /// Attach revision metadata from a stored record.
    #[must_use]
    pub fn with_revisions(mut self, kv: &KeyValue) -> Self {
        self.revision = Some(kv.mod_revision);
        self.create_revision = Some(kv.create_revision);
        self.mod_revision = Some(kv.mod_revision);
        self
    }
}

/// Cluster-wide summary shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub version: String,
    pub cluster_name: String,
    pub endpoints: Vec<String>,
    /// Hex member ID of the current leader. A weak reference: the member
    /// may be gone by the time it is looked up.
    pub leader: String,
    pub revision: i64,
    pub raft_term: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub roles: Vec<String>,
}

/// Access level granted by a role permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    Read,
    Write,
    #[serde(rename = "readwrite")]
    ReadWrite,
}

impl PermissionType {
    /// The etcd wire encoding (`READ = 0`, `WRITE = 1`, `READWRITE = 2`).
    #[must_use]
    pub fn as_wire(self) -> i32 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::ReadWrite => 2,
        }
    }

    /// Decode the etcd wire encoding. Unknown values fall back to `Read`.
    #[must_use]
    pub fn from_wire(value: i32) -> Self {
        match value {
            1 => Self::Write,
            2 => Self::ReadWrite,
            _ => Self::Read,
        }
    }
}

impl std::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "readwrite",
        })
    }
}

/// A key-range permission attached to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub perm_type: PermissionType,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<bool>,
}

impl Permission {
    /// Whether this permission covers the same key range as `other`,
    /// ignoring the access level.
    #[must_use]
    pub fn same_range(&self, other: &Self) -> bool {
        self.key == other.key
            && self.range_end == other.range_end
            && self.prefix.unwrap_or(false) == other.prefix.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    /// Hex lease ID.
    pub id: String,
    /// Remaining TTL in seconds, as last reported by the server.
    pub ttl: i64,
    pub granted_ttl: i64,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Hex member ID.
    pub id: String,
    pub name: String,
    #[serde(rename = "peerURLs")]
    pub peer_urls: Vec<String>,
    #[serde(rename = "clientURLs")]
    pub client_urls: Vec<String>,
    pub is_learner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlarmType {
    Nospace,
    Corrupt,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Hex member ID raising the alarm.
    #[serde(rename = "memberID")]
    pub member_id: String,
    pub alarm: AlarmType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub health: bool,
    /// Probe latency, formatted like `"1.234ms"`.
    pub took: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    pub endpoint: String,
    pub db_size: i64,
    pub db_size_in_use: i64,
    pub leader: String,
    pub raft_index: u64,
    pub raft_term: u64,
    pub raft_applied_index: u64,
    pub version: String,
}
