//! Error types for model parsing.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while parsing model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Unknown batch operation name.
    #[error("unknown batch operation: {0}")]
    UnknownOperation(String),

    /// Unknown customer status.
    #[error("unknown customer status: {0}")]
    UnknownStatus(String),

    /// Malformed local identifier.
    #[error("invalid local id: {0}")]
    InvalidLocalId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::UnknownOperation("merge".into());
        assert_eq!(err.to_string(), "unknown batch operation: merge");
    }
}
