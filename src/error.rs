//! Error types for stmtkit.
//!
//! Two taxonomies exist: `StatementError` covers failures raised by the
//! statement facade itself (structural precondition violations, wait
//! timeouts, async task failures), while `BackendError` belongs to the
//! session/driver collaborator and is propagated through unchanged.

use thiserror::Error;

/// Errors raised by the statement facade.
#[derive(Error, Debug)]
pub enum StatementError {
    /// An operation violated a structural precondition, such as enabling
    /// bulk mode with existing bindings or changing the storage kind while
    /// extraction buffers exist.
    #[error("invalid access: {0}")]
    InvalidAccess(String),

    /// The statement is not in a state that permits the operation.
    #[error("invalid statement state: {0}")]
    InvalidState(String),

    /// A binding was rejected at registration.
    #[error("binding error for parameter {index}: {message}")]
    Binding { index: usize, message: String },

    /// Data set navigation moved past either end.
    #[error("no data set at index {index} (statement has {count})")]
    NoDataSet { index: usize, count: usize },

    /// A bounded wait on an asynchronous execution expired. The execution
    /// itself is still pending and can be awaited again.
    #[error("wait timed out after {timeout_ms}ms")]
    WaitTimeout { timeout_ms: u64 },

    /// The background execution task panicked or was cancelled.
    #[error("asynchronous execution task failed: {0}")]
    AsyncTask(String),

    /// Driver/session failure, propagated unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors originating in the session/driver collaborator.
///
/// The facade never wraps, retries or suppresses these; their exact meaning
/// is defined by the backend implementation.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Server-side execution failure.
    #[error("database error: {0}")]
    Database(String),

    /// Connection-level failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend produced a reply the caller cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_access_display() {
        let err = StatementError::InvalidAccess("storage not modifiable".to_string());
        assert!(err.to_string().contains("invalid access"));
        assert!(err.to_string().contains("storage not modifiable"));
    }

    #[test]
    fn test_wait_timeout_display() {
        let err = StatementError::WaitTimeout { timeout_ms: 250 };
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_no_data_set_display() {
        let err = StatementError::NoDataSet { index: 3, count: 2 };
        assert!(err.to_string().contains("index 3"));
        assert!(err.to_string().contains("has 2"));
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: StatementError = BackendError::Database("table missing".to_string()).into();
        assert_eq!(err.to_string(), "database error: table missing");
    }
}
