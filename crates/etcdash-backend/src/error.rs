//! Backend error types.
//!
//! Every variant carries enough context to diagnose the failure without a
//! debugger. Server-side failures keep etcd's own message text verbatim
//! (e.g. `etcdserver: user name not found`) because the console's error
//! normalization keys off it.

/// Errors that can occur while talking to an etcd backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The etcd server rejected the request.
    #[error("{message}")]
    Status { message: String },

    /// The backend could not be reached or the connection broke.
    #[error("etcd unavailable: {reason}")]
    Unavailable { reason: String },

    /// A member or lease identifier could not be decoded.
    #[error("invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    /// Local I/O failed (e.g. writing a snapshot file).
    #[error("i/o error on '{path}': {reason}")]
    Io { path: String, reason: String },

    /// Anything else reported by the client library.
    #[error("{reason}")]
    Other { reason: String },
}

impl BackendError {
    /// Shorthand for a server-side rejection carrying etcd's message.
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    /// The raw message text used for classification.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Status { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
