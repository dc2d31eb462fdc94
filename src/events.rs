//! # Monitoring Events
//!
//! Fire-and-forget monitoring records for deprecation tracking and
//! resilience diagnostics. Publishing never blocks the caller and succeeds
//! even with zero subscribers; admin surfaces and tests subscribe when they
//! care.

use serde_json::Value;
use tokio::sync::broadcast;

/// Well-known event names published by this crate.
pub mod topics {
    /// A legacy (client-minted) payment reference was seen during verification.
    pub const LEGACY_REFERENCE: &str = "payment.legacy_reference";
    /// A previously unpaid order was settled through the recovery flow.
    pub const PAYMENT_RECOVERED: &str = "payment.recovered";
    /// A circuit breaker changed state.
    pub const BREAKER_STATE_CHANGE: &str = "circuit_breaker.state_change";
    /// Periodic circuit breaker health snapshot.
    pub const BREAKER_HEALTH: &str = "circuit_breaker.health";
}

/// Event that has been published.
#[derive(Debug, Clone)]
pub struct MonitoringEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Broadcast-channel publisher for monitoring records.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<MonitoringEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context.
    ///
    /// Synchronous and non-blocking: a full channel drops the oldest record
    /// for lagging subscribers, and having no subscribers at all is fine.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = MonitoringEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // send() errors only when there are no subscribers, which is an
        // acceptable outcome for monitoring records.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitoringEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
