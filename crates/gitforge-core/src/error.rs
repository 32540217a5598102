//! Error types module
//!
//! This module provides the closed error-kind taxonomy used throughout the
//! execution substrate. All errors are unified under the `AppError` enum so
//! that queue/pool retry policy and audit logging can dispatch on kind
//! without string matching.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// and how the queue should treat it.
pub trait ErrorMetadata {
    /// HTTP-shaped status code for the tool-protocol façade to surface.
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g. "INVALID_ARGUMENT").
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (the queue may retry it).
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client.
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message, already passed through the redactor.
    fn client_message(&self) -> String;

    /// Whether the raw `Display` output may contain sensitive detail that
    /// must never reach a client un-redacted.
    fn is_sensitive(&self) -> bool;

    /// Log level appropriate for this error when audited.
    fn log_level(&self) -> LogLevel;

    /// The `git_operations_total{status=...}` label for this error.
    fn metric_status(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Merge conflict: {message}")]
    MergeConflict {
        message: String,
        conflicted_files: Vec<String>,
    },

    #[error("Git operation error: {message}")]
    GitOperationError {
        message: String,
        suggestion: Option<String>,
    },

    #[error("Queue is at capacity")]
    TransientQueueFull,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unexpected error: {0}")]
    Unexpected(#[source] anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Unexpected(err)
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidArgument(_) => 400,
            AppError::RepositoryNotFound(_) => 404,
            AppError::AuthenticationError(_) => 401,
            AppError::MergeConflict { .. } => 409,
            AppError::GitOperationError { .. } => 500,
            AppError::TransientQueueFull => 503,
            AppError::Cancelled => 499,
            AppError::Unexpected(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::RepositoryNotFound(_) => "REPOSITORY_NOT_FOUND",
            AppError::AuthenticationError(_) => "AUTHENTICATION_ERROR",
            AppError::MergeConflict { .. } => "MERGE_CONFLICT",
            AppError::GitOperationError { .. } => "GIT_OPERATION_ERROR",
            AppError::TransientQueueFull => "TRANSIENT_QUEUE_FULL",
            AppError::Cancelled => "CANCELLED",
            AppError::Unexpected(_) => "UNEXPECTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            AppError::InvalidArgument(_) => false,
            AppError::RepositoryNotFound(_) => false,
            AppError::AuthenticationError(_) => false,
            AppError::MergeConflict { .. } => false,
            AppError::GitOperationError { .. } => true,
            AppError::TransientQueueFull => false,
            AppError::Cancelled => false,
            // Unexpected is retried the same way GitOperationError is, for
            // accounting purposes, per spec.
            AppError::Unexpected(_) => true,
        }
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::InvalidArgument(_) => Some("Check the arguments and try again"),
            AppError::RepositoryNotFound(_) => Some("Verify the repository URL or workspace id"),
            AppError::AuthenticationError(_) => Some("Check stored credentials"),
            AppError::MergeConflict { .. } => Some("Resolve conflicts and retry"),
            AppError::GitOperationError { .. } => Some("Retry after a short delay"),
            AppError::TransientQueueFull => Some("Retry after a short delay"),
            AppError::Cancelled => None,
            AppError::Unexpected(_) => Some("Retry after a short delay"),
        }
    }

    fn client_message(&self) -> String {
        use crate::sanitize::redact_error;
        match self {
            AppError::MergeConflict {
                message,
                conflicted_files,
            } => {
                // Both message and file list are surfaced per spec; file
                // names are not redacted, only the free-text message is.
                if conflicted_files.is_empty() {
                    redact_error(message, None)
                } else {
                    format!(
                        "{} (conflicted files: {})",
                        redact_error(message, None),
                        conflicted_files.join(", ")
                    )
                }
            }
            AppError::GitOperationError { message, .. } => redact_error(message, None),
            other => redact_error(&other.to_string(), None),
        }
    }

    fn is_sensitive(&self) -> bool {
        matches!(
            self,
            AppError::AuthenticationError(_) | AppError::Unexpected(_)
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidArgument(_) => LogLevel::Debug,
            AppError::RepositoryNotFound(_) => LogLevel::Debug,
            AppError::AuthenticationError(_) => LogLevel::Warn,
            AppError::MergeConflict { .. } => LogLevel::Warn,
            AppError::GitOperationError { .. } => LogLevel::Error,
            AppError::TransientQueueFull => LogLevel::Warn,
            AppError::Cancelled => LogLevel::Debug,
            AppError::Unexpected(_) => LogLevel::Error,
        }
    }

    fn metric_status(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_arg",
            AppError::RepositoryNotFound(_) => "not_found",
            AppError::AuthenticationError(_) => "auth_failed",
            AppError::MergeConflict { .. } => "conflict",
            AppError::GitOperationError { .. } => "error",
            AppError::TransientQueueFull => "mcp_error",
            AppError::Cancelled => "cancelled",
            AppError::Unexpected(_) => "unexpected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_conflict_surfaces_files() {
        let err = AppError::MergeConflict {
            message: "conflict while merging".to_string(),
            conflicted_files: vec!["a.txt".to_string(), "b.txt".to_string()],
        };
        let msg = err.client_message();
        assert!(msg.contains("a.txt"));
        assert!(msg.contains("b.txt"));
    }

    #[test]
    fn unexpected_is_recoverable_for_accounting() {
        let err = AppError::Unexpected(anyhow::anyhow!("boom"));
        assert!(err.is_recoverable());
        assert_eq!(err.metric_status(), "unexpected");
    }

    #[test]
    fn invalid_argument_is_not_recoverable() {
        let err = AppError::InvalidArgument("bad branch name".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.http_status_code(), 400);
    }
}
