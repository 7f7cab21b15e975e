//! Error normalization for `etcdash-core`.
//!
//! Every backend failure passes through [`normalize`] exactly once, which
//! folds it into a closed taxonomy of [`ErrorCode`]s with a human message.
//! Callers that treat "not found" as an ordinary outcome use
//! [`ConsoleResultExt::or_not_found`] to substitute a default.

use std::fmt;

use etcdash_backend::BackendError;
use serde::Serialize;

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthFailed,
    PermissionDenied,
    NotFound,
    AuthNotEnabled,
    EtcdError,
    UnknownError,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailed => "AUTH_FAILED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NotFound => "NOT_FOUND",
            Self::AuthNotEnabled => "AUTH_NOT_ENABLED",
            Self::EtcdError => "ETCD_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by console operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// A normalized backend failure.
    #[error("[{code}] {message}")]
    Etcd { code: ErrorCode, message: String },

    /// Input rejected before reaching the backend.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl ConsoleError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// The taxonomy code, or `None` for rejected input.
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Etcd { code, .. } => Some(*code),
            Self::InvalidInput { .. } => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }
}

impl From<BackendError> for ConsoleError {
    fn from(err: BackendError) -> Self {
        normalize(&err)
    }
}

/// Substrings of etcd messages naming a missing entity other than a key.
const ENTITY_NOT_FOUND: [&str; 4] = [
    "user name not found",
    "role name not found",
    "member not found",
    "lease not found",
];

/// Map a backend failure into the console taxonomy.
///
/// Classification is by message substring and first match wins, so an
/// authentication failure that also mentions "not found" stays
/// `AUTH_FAILED`.
#[must_use]
pub fn normalize(err: &BackendError) -> ConsoleError {
    let raw = err.message();
    let (code, message) = if raw.contains("authentication failed")
        || raw.contains("invalid user ID or password")
    {
        (
            ErrorCode::AuthFailed,
            "Authentication failed. Please check your credentials.".to_owned(),
        )
    } else if raw.contains("permission denied") || raw.contains("user name is empty") {
        (
            ErrorCode::PermissionDenied,
            "Permission denied. You do not have access to this resource.".to_owned(),
        )
    } else if raw.contains("key not found") {
        (
            ErrorCode::NotFound,
            "The requested key was not found.".to_owned(),
        )
    } else if ENTITY_NOT_FOUND.iter().any(|s| raw.contains(s)) {
        (ErrorCode::NotFound, raw)
    } else if raw.contains("authentication is not enabled") {
        (
            ErrorCode::AuthNotEnabled,
            "Authentication is not enabled on this etcd cluster.".to_owned(),
        )
    } else {
        match err {
            BackendError::Status { .. } | BackendError::Unavailable { .. } => {
                (ErrorCode::EtcdError, raw)
            }
            BackendError::InvalidId { .. } | BackendError::Io { .. } | BackendError::Other { .. } => {
                (ErrorCode::UnknownError, raw)
            }
        }
    };
    ConsoleError::Etcd { code, message }
}

/// Absorb `NOT_FOUND` into a caller-supplied default.
pub trait ConsoleResultExt<T> {
    /// Replace a `NOT_FOUND` failure with `default`; every other error
    /// propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns the original error unless it is `NOT_FOUND`.
    fn or_not_found(self, default: T) -> Result<T, ConsoleError>;
}

impl<T> ConsoleResultExt<T> for Result<T, ConsoleError> {
    fn or_not_found(self, default: T) -> Result<T, ConsoleError> {
        match self {
            Err(e) if e.is_not_found() => Ok(default),
            other => other,
        }
    }
}

impl<T> ConsoleResultExt<T> for Result<T, BackendError> {
    fn or_not_found(self, default: T) -> Result<T, ConsoleError> {
        self.map_err(ConsoleError::from).or_not_found(default)
    }
}
