//! HTTP error types for the `etcdash` server.
//!
//! Maps console errors into HTTP responses. Every response carries a JSON
//! body with a machine-readable `error` kind, the taxonomy `code`, a
//! human-readable `message`, and whether retrying can help.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use etcdash_core::error::{ConsoleError, ErrorCode};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Credentials were rejected by etcd.
    Unauthorized(String),
    /// The operation is not allowed for the configured user, or auth is off.
    Forbidden { code: ErrorCode, message: String },
    /// The named entity does not exist.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// etcd returned an error or could not be reached.
    Upstream(String),
    /// Anything else.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    code: &'static str,
    message: String,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                ErrorCode::AuthFailed.as_str(),
                msg,
            ),
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code.as_str(), message)
            }
            Self::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found",
                ErrorCode::NotFound.as_str(),
                msg,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", "INVALID_INPUT", msg),
            Self::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                "etcd_error",
                ErrorCode::EtcdError.as_str(),
                msg,
            ),
            Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                ErrorCode::UnknownError.as_str(),
                msg,
            ),
        };

        let retryable = !matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        );

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), code, message = %message, "request failed");
        }

        let body = ErrorBody {
            error: error_type,
            code,
            message,
            retryable,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ConsoleError> for AppError {
    fn from(err: ConsoleError) -> Self {
        let rendered = err.to_string();
        match err {
            ConsoleError::InvalidInput { reason } => Self::BadRequest(reason),
            ConsoleError::Etcd { code, .. } => match code {
                ErrorCode::AuthFailed => Self::Unauthorized(rendered),
                ErrorCode::PermissionDenied | ErrorCode::AuthNotEnabled => {
                    Self::Forbidden { code, message: rendered }
                }
                ErrorCode::NotFound => Self::NotFound(rendered),
                ErrorCode::EtcdError => Self::Upstream(rendered),
                ErrorCode::UnknownError => Self::Internal(rendered),
            },
        }
    }
}
