//! Domain event system - decoupled signals out of the engine.
//!
//! Events are published when an exchange completes, fails, or sessions
//! are swept. Embedding servers can subscribe for telemetry without the
//! core taking a dependency on any metrics stack.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An exchange was committed to a session
    ExchangeCompleted {
        session_key: String,
        task: String,
        intent: String,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// A gateway call failed; no turns were committed
    GatewayFailed {
        session_key: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A TTL sweep removed expired sessions
    SessionsSwept {
        removed: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Subscribers receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::SessionsSwept {
            removed: 3,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::SessionsSwept { removed, .. } => assert_eq!(*removed, 3),
            _ => panic!("Expected SessionsSwept event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::GatewayFailed {
            session_key: "s1".into(),
            reason: "timeout".into(),
            timestamp: Utc::now(),
        });
    }
}
