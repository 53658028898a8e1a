//! Where sessions publish their progress.
//!
//! A session only knows an [`EventBus`]; the CLI logs events, tests capture
//! them, and library users that do not care pass [`NullEventBus`].

use std::sync::{Arc, Mutex, PoisonError};

/// Sink for session and history events.
pub trait EventBus: Send + Sync {
    /// Publish `payload` under `topic` (one of [`crate::event_names`]).
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

/// Type alias for shared event bus reference.
pub type EventBusRef = Arc<dyn EventBus>;

/// An event as captured by [`InMemoryEventBus`].
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Keeps every event in emission order.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured events published under `topic`, oldest first.
    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EmittedEvent {
                topic: topic.to_string(),
                payload,
            });
    }
}

/// Forwards every event to `tracing` at debug level.
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        tracing::debug!(topic, %payload, "event");
    }
}

/// Drops every event.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_names;
    use serde_json::json;

    #[test]
    fn test_in_memory_bus_filters_by_topic_in_order() {
        let bus = InMemoryEventBus::new();

        bus.emit(event_names::SESSION_STATE_CHANGED, json!({"state": "loading"}));
        bus.emit(event_names::HISTORY_UPDATED, json!({"original_text": "a"}));
        bus.emit(event_names::SESSION_STATE_CHANGED, json!({"state": "result"}));

        let states: Vec<_> = bus
            .events_for(event_names::SESSION_STATE_CHANGED)
            .into_iter()
            .map(|e| e.payload["state"].clone())
            .collect();
        assert_eq!(states, vec![json!("loading"), json!("result")]);
        assert_eq!(bus.events_for(event_names::HISTORY_UPDATED).len(), 1);
        assert!(bus.events_for(event_names::SESSION_FINISHED).is_empty());
    }

    #[test]
    fn test_buses_usable_as_trait_objects() {
        let buses: Vec<EventBusRef> = vec![
            Arc::new(InMemoryEventBus::new()),
            Arc::new(TracingEventBus),
            Arc::new(NullEventBus),
        ];
        for bus in buses {
            bus.emit(event_names::SESSION_FINISHED, json!({"phrase": null}));
        }
    }
}
