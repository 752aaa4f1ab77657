//! Change notifications for manager state.
//!
//! Front ends that render manager state subscribe here instead of polling.
//! The manager emits one event per state change, after the change has been
//! applied and written through.
//!
//! Attaching a bus is optional. The `servconf` binary subscribes only to log
//! changes at debug level; richer front ends render from it.
//!
//! # Example
//!
//! ```rust
//! use servconf_core::event_bus::{EventBus, CONFIG_CHANGED};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(EventBus::new());
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CONFIG_CHANGED, &serde_json::json!({"username": "admin"}));
//!
//! let event = rx.try_recv().unwrap();
//! assert_eq!(event.event_type, CONFIG_CHANGED);
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
/// Events beyond this capacity will cause slow subscribers to miss events (lag).
const DEFAULT_CAPACITY: usize = 256;

/// The live document changed. Payload: the document, or `null` if unset.
pub const CONFIG_CHANGED: &str = "config:changed";

/// History gained, lost or replaced entries. Payload: `{"len": n}`.
pub const HISTORY_CHANGED: &str = "history:changed";

/// The notebook cards cache changed. Payload: the cards.
pub const NOTEBOOK_CARDS_CHANGED: &str = "notebook-cards:changed";

/// The active tab changed. Payload: the tab name.
pub const TAB_CHANGED: &str = "tab:changed";

/// An event type and its JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl BroadcastEvent {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Broadcasts state changes to any number of subscribers.
///
/// Sending never blocks and needs no runtime, so the manager can emit from
/// plain synchronous code.
pub struct EventBus {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event; 0 when
    /// nobody is listening or the payload cannot be serialized.
    pub fn emit<T: Serialize>(&self, event_type: &str, payload: &T) -> usize {
        let json_payload = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Failed to serialize {} payload: {}", event_type, e);
                return 0;
            }
        };

        self.sender
            .send(BroadcastEvent::new(event_type, json_payload))
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_and_drop_track_count() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn emit_returns_zero_with_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(TAB_CHANGED, &"general"), 0);
    }

    #[test]
    fn emit_is_received_without_a_runtime() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        assert_eq!(bus.emit(HISTORY_CHANGED, &json!({"len": 3})), 1);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type, HISTORY_CHANGED);
        assert_eq!(event.payload["len"], 3);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(CONFIG_CHANGED, &json!({"n": 1}));
        bus.emit(TAB_CHANGED, &"flags");

        for rx in [&mut rx1, &mut rx2] {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            assert_eq!(first.event_type, CONFIG_CHANGED);
            assert_eq!(first.payload["n"], 1);
            assert_eq!(second.payload, json!("flags"));
        }
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        for n in 0..5 {
            bus.emit(HISTORY_CHANGED, &json!({"len": n}));
        }

        let result = rx.recv().await;
        assert!(matches!(
            result,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
