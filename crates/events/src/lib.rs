//! Shared event contracts for polishing sessions and the history store.
//!
//! This crate defines the DTOs for events that flow from the session and the
//! history store to whoever renders them. Using shared types prevents runtime
//! deserialization errors from mismatched field names.
//!
//! Also provides the `EventBus` trait for decoupled event emission.

mod bus;

pub use bus::{EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus, TracingEventBus};

use serde::{Deserialize, Serialize};

/// Coarse session phase carried by state events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Input,
    Loading,
    Result,
    Error,
    Finished,
}

/// Event emitted on every session state transition.
///
/// Producers: session
/// Consumers: cli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateEvent {
    /// Phase entered.
    pub state: SessionPhase,
    /// Draft text at the time of the transition.
    pub draft: String,
    /// Primary phrase, present in `result`.
    #[serde(default)]
    pub idiom: Option<String>,
    /// Error message, present in `error`.
    #[serde(default)]
    pub message: Option<String>,
}

/// Event emitted when a session ends.
///
/// Producers: session
/// Consumers: cli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFinishedEvent {
    /// Chosen phrase, `None` when the user cancelled.
    #[serde(default)]
    pub phrase: Option<String>,
}

/// Event emitted after a polish result has been written to history.
///
/// Producers: session (history write side effect)
/// Consumers: cli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryUpdatedEvent {
    pub original_text: String,
    pub idiom: String,
    /// Record timestamp in milliseconds since epoch.
    pub timestamp: i64,
}

/// Event emitted when the history write side effect fails.
///
/// Producers: session
/// Consumers: cli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPersistFailedEvent {
    pub original_text: String,
    pub error: String,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Session state transition.
    pub const SESSION_STATE_CHANGED: &str = "session:state_changed";
    /// Session reached its terminal state.
    pub const SESSION_FINISHED: &str = "session:finished";
    /// History record written.
    pub const HISTORY_UPDATED: &str = "history:updated";
    /// History write failed.
    pub const HISTORY_PERSIST_FAILED: &str = "history:persist_failed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_event_serialize() {
        let event = SessionStateEvent {
            state: SessionPhase::Result,
            draft: "他很高兴".to_string(),
            idiom: Some("欣喜若狂".to_string()),
            message: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "result");
        assert_eq!(json["idiom"], "欣喜若狂");
    }

    #[test]
    fn test_state_event_deserialize_minimal() {
        let json = r#"{"state": "input", "draft": ""}"#;
        let event: SessionStateEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.state, SessionPhase::Input);
        assert_eq!(event.idiom, None);
        assert_eq!(event.message, None);
    }
}
