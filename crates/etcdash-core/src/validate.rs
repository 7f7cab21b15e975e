//! Boundary validation for mutations.
//!
//! Checks are deliberately light: they reject input that etcd would
//! reject anyway or that can only be a typing mistake, and leave every
//! semantic decision to the cluster.

use etcdash_backend::{LeaseId, MemberId, Permission};
use url::Url;

use crate::error::ConsoleError;

/// A user or role name, trimmed. `kind` names the field in the error.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if the name is blank.
pub fn name(kind: &str, raw: &str) -> Result<String, ConsoleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::invalid(format!("{kind} name must not be empty")));
    }
    Ok(trimmed.to_owned())
}

/// A new password and its optional confirmation.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if the password is empty or the
/// confirmation differs.
pub fn password(password: &str, confirmation: Option<&str>) -> Result<(), ConsoleError> {
    if password.is_empty() {
        return Err(ConsoleError::invalid("password must not be empty"));
    }
    if confirmation.is_some_and(|c| c != password) {
        return Err(ConsoleError::invalid("passwords do not match"));
    }
    Ok(())
}

/// A key to write.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if the key is empty.
pub fn key(raw: &str) -> Result<&str, ConsoleError> {
    if raw.is_empty() {
        return Err(ConsoleError::invalid("key must not be empty"));
    }
    Ok(raw)
}

/// Peer URLs for a member update.
///
/// Each entry may itself be a comma-separated list, as typed into a form
/// field. Blank entries are dropped.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if no URL remains or any entry
/// is not an absolute `http`/`https` URL with a host.
pub fn peer_urls(input: &[String]) -> Result<Vec<String>, ConsoleError> {
    let urls: Vec<String> = input
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if urls.is_empty() {
        return Err(ConsoleError::invalid("at least one peer URL is required"));
    }

    for raw in &urls {
        let parsed = Url::parse(raw)
            .map_err(|e| ConsoleError::invalid(format!("invalid peer URL '{raw}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConsoleError::invalid(format!(
                "peer URL '{raw}' must use http or https"
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(ConsoleError::invalid(format!("peer URL '{raw}' has no host")));
        }
    }
    Ok(urls)
}

/// A permission to grant or revoke.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if the key is empty.
pub fn permission(permission: &Permission) -> Result<(), ConsoleError> {
    if permission.key.is_empty() {
        return Err(ConsoleError::invalid("permission key must not be empty"));
    }
    Ok(())
}

/// A member ID in display form.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if `raw` is not a 64-bit hex value.
pub fn member_id(raw: &str) -> Result<MemberId, ConsoleError> {
    MemberId::parse_hex(raw).map_err(|e| ConsoleError::invalid(e.to_string()))
}

/// A lease ID in display form.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidInput`] if `raw` is not a valid lease ID.
pub fn lease_id(raw: &str) -> Result<LeaseId, ConsoleError> {
    LeaseId::parse_hex(raw).map_err(|e| ConsoleError::invalid(e.to_string()))
}
