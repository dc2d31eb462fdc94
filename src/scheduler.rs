//! Cancellable periodic background tasks.
//!
//! Reconciliation runs a handful of recurring jobs (breaker health
//! reporting, stale-payment sweeps). [`spawn_periodic`] wraps the tokio
//! interval plumbing so callers only supply the tick body, and returns a
//! handle whose drop aborts the task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::events::{topics, EventPublisher};
use crate::resilience::CircuitBreaker;

/// Handle to a running periodic task. Cancels on drop.
#[derive(Debug)]
pub struct ScheduledHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl ScheduledHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the task. Idempotent.
    pub fn cancel(&self) {
        debug!(task = %self.name, "cancelling scheduled task");
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a task that invokes `tick` every `period`. Slow ticks do not pile
/// up: missed ticks are skipped rather than burst-delivered.
pub fn spawn_periodic<F, Fut>(name: &str, period: Duration, mut tick: F) -> ScheduledHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let task_name = name.to_string();
    info!(task = %task_name, period_ms = period.as_millis() as u64, "starting scheduled task");

    let loop_name = task_name.clone();
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval fires immediately; consume it
        // so the first invocation happens one full period after spawn.
        interval.tick().await;
        loop {
            interval.tick().await;
            debug!(task = %loop_name, "scheduled task tick");
            tick().await;
        }
    });

    ScheduledHandle {
        name: task_name,
        handle,
    }
}

/// Periodically publish breaker health snapshots to the monitoring stream.
pub fn spawn_breaker_health_monitor(
    breakers: Vec<Arc<CircuitBreaker>>,
    events: EventPublisher,
    period: Duration,
) -> ScheduledHandle {
    spawn_periodic("circuit-breaker-health", period, move || {
        let breakers = breakers.clone();
        let events = events.clone();
        async move {
            for breaker in &breakers {
                let stats = breaker.stats();
                events.publish(
                    topics::BREAKER_HEALTH,
                    json!({
                        "component": breaker.name(),
                        "state": stats.state,
                        "failure_count": stats.failure_count,
                        "success_count": stats.success_count,
                        "rejected_count": stats.rejected_count,
                    }),
                );
            }
        }
    })
}
