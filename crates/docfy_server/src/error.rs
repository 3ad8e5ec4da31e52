//! Error types for the Docfy server.

use docfy_storage::StorageError;
use docfy_sync_engine::SyncError;
use serde::Serialize;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the request handlers.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid or incomplete request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Missing, malformed or expired token.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The contacts provider failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error payload handed to the transport layer, as `{name, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Error category.
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::AuthenticationFailed(_) | ServerError::NotAuthorized(_) => 401,
            ServerError::NotFound(_) => 404,
            ServerError::Conflict(_) => 409,
            ServerError::Upstream(_) => 502,
            ServerError::Storage(_) | ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Returns the error category name.
    pub fn name(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "InvalidRequest",
            ServerError::AuthenticationFailed(_) => "AuthenticationFailed",
            ServerError::NotAuthorized(_) => "UnauthorizedError",
            ServerError::Conflict(_) => "Conflict",
            ServerError::NotFound(_) => "NotFound",
            ServerError::Upstream(_) => "UpstreamError",
            ServerError::Storage(_) => "StorageError",
            ServerError::Internal(_) => "InternalError",
        }
    }

    /// Renders the payload for the transport layer.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            name: self.name().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate { collection, key } => {
                ServerError::Conflict(format!("{collection} {key} already exists"))
            }
            StorageError::NotFound { collection, key } => {
                ServerError::NotFound(format!("{collection} {key}"))
            }
            other => ServerError::Storage(other),
        }
    }
}

impl From<SyncError> for ServerError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::AuthenticationFailed(message) => ServerError::AuthenticationFailed(message),
            SyncError::Storage(storage) => storage.into(),
            SyncError::UnknownBox(email) => ServerError::NotFound(format!("contact box {email}")),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
        assert_eq!(ServerError::NotAuthorized("x".into()).status_code(), 401);
        assert_eq!(ServerError::Upstream("x".into()).status_code(), 502);
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let err: ServerError = StorageError::Duplicate {
            collection: "user",
            key: "ana".into(),
        }
        .into();
        assert_eq!(err.status_code(), 409);

        let err: ServerError = StorageError::Corrupted("bad".into()).into();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn sync_errors_map_to_statuses() {
        let err: ServerError = SyncError::AuthenticationFailed("invalid_grant".into()).into();
        assert_eq!(err.status_code(), 401);

        let err: ServerError = SyncError::Timeout.into();
        assert_eq!(err.status_code(), 502);

        let err: ServerError = SyncError::UnknownBox("a@x.com".into()).into();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn body_carries_name_and_message() {
        let body = ServerError::InvalidRequest("Please fill out all fields".into()).body();
        assert_eq!(body.name, "InvalidRequest");
        assert!(body.message.contains("fill out all fields"));
    }
}
