//! Error types for the sync engine.

use docfy_model::BatchOperation;
use docfy_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote API answered with a non-success status.
    #[error("remote returned status {status}: {body}")]
    RemoteStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Authentication or credential refresh failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Protocol error (unexpected response format).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A contact box referenced by the operation is not registered.
    #[error("contact box not registered: {0}")]
    UnknownBox(String),

    /// A batch against one contact box failed.
    #[error("{operation} propagation to {box_email} failed: {source}")]
    Propagation {
        /// Email of the box the batch was sent to.
        box_email: String,
        /// Batch operation.
        operation: BatchOperation,
        /// Underlying failure.
        #[source]
        source: Box<SyncError>,
    },

    /// Timeout.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Wraps an error as the failure of one box batch.
    pub fn propagation(
        box_email: impl Into<String>,
        operation: BatchOperation,
        source: SyncError,
    ) -> Self {
        Self::Propagation {
            box_email: box_email.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::RemoteStatus { status, .. } => *status >= 500 || *status == 429,
            SyncError::Timeout => true,
            SyncError::Storage(StorageError::Io(_)) => true,
            SyncError::Propagation { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_decode() {
            SyncError::Protocol(err.to_string())
        } else {
            SyncError::transport_retryable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::RemoteStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(SyncError::RemoteStatus {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncError::RemoteStatus {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncError::AuthenticationFailed("revoked".into()).is_retryable());
    }

    #[test]
    fn propagation_inherits_retryability() {
        let err = SyncError::propagation("a@x.com", BatchOperation::Create, SyncError::Timeout);
        assert!(err.is_retryable());

        let err = SyncError::propagation(
            "a@x.com",
            BatchOperation::Delete,
            SyncError::Protocol("bad xml".into()),
        );
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "delete propagation to a@x.com failed: protocol error: bad xml"
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: SyncError = StorageError::Corrupted("x".into()).into();
        assert!(matches!(err, SyncError::Storage(_)));
        assert!(!err.is_retryable());
    }
}
