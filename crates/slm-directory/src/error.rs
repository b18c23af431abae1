//! Directory error types
//!
//! Errors surfaced by identity resolution and group-membership operations.
//! Nothing here is retried internally; every variant carries enough context
//! (input, kind, container) to diagnose the failure without the logs.

use thiserror::Error;

use crate::identity::IdentityKind;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Error that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Caller supplied inputs that do not fit the requested operation.
    /// Raised before any directory call is made.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Input did not resolve to exactly one directory object of the requested kind.
    #[error("unable to resolve {kind} '{input}': {}", describe_matches(*matches))]
    ResolutionFailed {
        input: String,
        kind: IdentityKind,
        matches: usize,
    },

    /// Subject could not be resolved as a user nor as a computer.
    #[error("unable to resolve identity '{input}' as a user or a computer")]
    UnresolvedIdentity { input: String },

    /// Directory configuration is invalid.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// Failed to establish or bind a connection to the directory.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bind credentials were rejected.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Directory rejected or failed an operation.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Object addressed by a mutation does not exist.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },
}

fn describe_matches(matches: usize) -> String {
    if matches == 0 {
        "no matching object".to_string()
    } else {
        format!("{matches} matching objects, expected exactly one")
    }
}

impl DirectoryError {
    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::Validation { .. } => "VALIDATION_FAILED",
            DirectoryError::ResolutionFailed { .. } => "RESOLUTION_FAILED",
            DirectoryError::UnresolvedIdentity { .. } => "UNRESOLVED_IDENTITY",
            DirectoryError::Configuration { .. } => "INVALID_CONFIG",
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::AuthenticationFailed => "AUTH_FAILED",
            DirectoryError::OperationFailed { .. } => "OPERATION_FAILED",
            DirectoryError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
        }
    }

    /// Whether the error was raised from caller input rather than the directory.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::Validation { .. }
                | DirectoryError::ResolutionFailed { .. }
                | DirectoryError::UnresolvedIdentity { .. }
        )
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        DirectoryError::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        DirectoryError::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
