//! Error types for session side effects.

use polisher_core::HandoffError;
use polisher_storage::StorageError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures a session cannot absorb into its own state.
///
/// Remote failures are not here: they become the `Error` state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The history write that follows a successful polish failed.
    #[error("failed to write history: {0}")]
    Persistence(#[from] StorageError),

    /// The history write task panicked or was aborted.
    #[error("history write task failed: {0}")]
    PersistenceTask(String),

    /// The host rejected the handed-off phrase.
    #[error("handoff failed: {0}")]
    Handoff(#[from] HandoffError),
}
