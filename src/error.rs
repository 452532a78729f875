//! Error types for media-dl
//!
//! This module provides error handling for the engine, including:
//! - Domain-specific error types (Job, Resolution, Transfer, etc.)
//! - The duplicate/illegal-transition errors surfaced synchronously to callers
//! - Persistence errors that the engine logs and swallows (§7 policy: an
//!   unavailable store must not fail an otherwise-successful download)

use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Submission rejected: the source URL was already downloaded
    #[error("duplicate source: {0}")]
    Duplicate(String),

    /// The resolver could not identify the content behind a URL (retryable)
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// Network or I/O failure during materialization (retryable)
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// A batch crawl discovered no members in any sub-category
    #[error("no items found in collection: {0}")]
    NoItemsFound(String),

    /// Job-related error (not found, illegal state transition)
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Persistence collaborator failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// SQLx database error (bundled SQLite store)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation was aborted by an explicit cancel or pause
    #[error("operation cancelled")]
    Cancelled,

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Job-related errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Job not found in queue, active set, or paused set
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: i64,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} job {id} in state {current_state}")]
    InvalidState {
        /// The job ID that is in an invalid state for the operation
        id: i64,
        /// The operation that was attempted (e.g., "pause", "resume", "cancel")
        operation: String,
        /// The current state that prevents the operation
        current_state: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = Error::Duplicate("https://example.com/v/1".to_string());
        assert!(err.to_string().contains("duplicate source"));
        assert!(err.to_string().contains("example.com"));

        let err = Error::Job(JobError::InvalidState {
            id: 42,
            operation: "pause".to_string(),
            current_state: "completed".to_string(),
        });
        assert_eq!(err.to_string(), "job error: cannot pause job 42 in state completed");
    }

    #[test]
    fn job_error_converts_to_error() {
        let err: Error = JobError::NotFound { id: 7 }.into();
        assert!(matches!(err, Error::Job(JobError::NotFound { id: 7 })));
    }
}
