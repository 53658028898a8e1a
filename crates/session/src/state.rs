//! Session state snapshots.

use polisher_core::PolishResult;
use polisher_events::{SessionPhase, SessionStateEvent};

/// Observable state of a polishing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user to commit a draft.
    Input { draft: String },
    /// A remote call for `text` is in flight.
    Loading { text: String },
    /// A result is on display. `draft` is the text it was produced for.
    Result { result: PolishResult, draft: String },
    /// The last attempt failed. `draft` is restored on dismiss.
    Error { message: String, draft: String },
    /// Terminal. `phrase` is what was handed off, `None` when cancelled.
    Finished { phrase: Option<String> },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Input { .. } => SessionPhase::Input,
            Self::Loading { .. } => SessionPhase::Loading,
            Self::Result { .. } => SessionPhase::Result,
            Self::Error { .. } => SessionPhase::Error,
            Self::Finished { .. } => SessionPhase::Finished,
        }
    }

    /// Draft text carried by the state, empty once finished.
    pub fn draft(&self) -> &str {
        match self {
            Self::Input { draft } | Self::Result { draft, .. } | Self::Error { draft, .. } => draft,
            Self::Loading { text } => text,
            Self::Finished { .. } => "",
        }
    }

    pub fn result(&self) -> Option<&PolishResult> {
        match self {
            Self::Result { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    pub(crate) fn to_event(&self) -> SessionStateEvent {
        SessionStateEvent {
            state: self.phase(),
            draft: self.draft().to_string(),
            idiom: self.result().map(|r| r.idiom.clone()),
            message: self.error_message().map(str::to_string),
        }
    }
}
