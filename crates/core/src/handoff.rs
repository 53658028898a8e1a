//! Contract with the context that consumes the chosen phrase.

use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a host collaborator.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("failed to deliver phrase: {0}")]
    Delivery(String),
}

/// Receives the outcome of a session.
///
/// Called at most once per session: with `Some(phrase)` when the user picks a
/// suggestion, with `None` when the user cancels. Whether the phrase replaces
/// text in the caller, lands on the clipboard, or both is up to the
/// implementation.
pub trait HostHandoff: Send + Sync {
    fn on_finish(&self, phrase: Option<&str>) -> Result<(), HandoffError>;
}

/// Type alias for a shared handoff reference.
pub type HostHandoffRef = Arc<dyn HostHandoff>;
