//! Error types for the sync layer.

use cirrus_model::ModelError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while mutating or synchronizing an object.
///
/// `Clone` so that callers joining an in-flight save all receive the same
/// outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Malformed field or operation, detected before anything is sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response carrying a server-defined code.
    #[error("server error {status} ({code}): {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    /// The server reported a different identity or a version mismatch.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Fetch or delete on an object without an identity.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The target no longer exists on the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Returns true for failures a caller may reasonably retry as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<ModelError> for SyncError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::IdentityConflict { .. } => SyncError::Conflict(e.to_string()),
            ModelError::MissingObjectId { .. } => SyncError::Protocol(e.to_string()),
            other => SyncError::Validation(other.to_string()),
        }
    }
}

impl From<cirrus_types::Error> for SyncError {
    fn from(e: cirrus_types::Error) -> Self {
        SyncError::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Protocol(e.to_string())
    }
}
