//! # Circuit Breaker Implementation
//!
//! Fault isolation for unreliable remote dependencies. Classic three-state
//! pattern: Closed (normal operation), Open (failing fast), and Half-Open
//! (testing recovery with a probe call). Failures are counted over a sliding
//! monitoring window rather than consecutively, so a slow trickle of old
//! failures cannot trip the circuit.
//!
//! Breakers are explicit, constructor-injected instances owned by whatever
//! composes the application; tests instantiate isolated copies instead of
//! sharing hidden global state.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::config::CircuitBreakerConfig;
use crate::events::{topics, EventPublisher};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - a probe call is allowed through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // default to the safest state
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls without executing them
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation ran and failed; the failure has been recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Read-only snapshot of breaker state for diagnostics and admin surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    /// Failures currently inside the monitoring window
    pub recent_failures: u32,
    pub half_open_successes: u32,
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Calls rejected while the circuit was open
    pub rejected_count: u64,
    /// Time until the next probe is allowed, when open
    pub next_attempt_in: Option<Duration>,
}

/// Mutable bookkeeping protected by a mutex. Lock sections are short and
/// never held across an await point.
#[derive(Debug, Default)]
struct BreakerBook {
    failure_times: VecDeque<Instant>,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    total_calls: u64,
    success_count: u64,
    failure_count: u64,
    rejected_count: u64,
}

/// Core circuit breaker with atomic state management.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and monitoring records
    name: String,

    /// Current circuit state (atomic for cheap reads)
    state: AtomicU8,

    config: CircuitBreakerConfig,

    book: Mutex<BreakerBook>,

    /// Optional monitoring publisher for state-change records
    events: Option<EventPublisher>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_secs = config.recovery_timeout.as_secs(),
            monitoring_window_secs = config.monitoring_window.as_secs(),
            success_threshold = config.success_threshold,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            book: Mutex::new(BreakerBook::default()),
            events: None,
        }
    }

    /// Attach a monitoring publisher; state changes will emit
    /// `circuit_breaker.state_change` records (fire-and-forget).
    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = Some(events);
        self
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// Fails fast with [`CircuitBreakerError::CircuitOpen`] while the circuit
    /// is open and the recovery timeout has not elapsed. The first call after
    /// expiry transitions the circuit to half-open and runs as the probe.
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.acquire_permit() {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let result = operation().await;

        match &result {
            Ok(_) => self.on_success(),
            Err(_) => self.on_failure(),
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Read-only snapshot of current breaker state.
    pub fn stats(&self) -> CircuitBreakerStats {
        let mut book = self.book.lock();
        let now = Instant::now();
        Self::prune_window(&mut book, now, self.config.monitoring_window);

        let next_attempt_in = match self.state() {
            CircuitState::Open => book
                .opened_at
                .map(|at| self.config.recovery_timeout.saturating_sub(now - at)),
            _ => None,
        };

        CircuitBreakerStats {
            state: self.state(),
            recent_failures: book.failure_times.len() as u32,
            half_open_successes: book.half_open_successes,
            total_calls: book.total_calls,
            success_count: book.success_count,
            failure_count: book.failure_count,
            rejected_count: book.rejected_count,
            next_attempt_in,
        }
    }

    /// Force the circuit closed and clear all failure history.
    pub fn reset(&self) {
        let mut book = self.book.lock();
        warn!(component = %self.name, "🚨 Circuit breaker reset to closed");
        self.transition_to_closed(&mut book);
    }

    /// Force the circuit open (for emergency situations).
    pub fn force_open(&self) {
        let mut book = self.book.lock();
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        self.transition_to_open(&mut book);
    }

    /// Decide whether a call may proceed, transitioning open circuits to
    /// half-open once the recovery timeout has elapsed.
    fn acquire_permit(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let mut book = self.book.lock();
                // Re-check under the lock; another caller may have already
                // transitioned the state.
                if self.state() != CircuitState::Open {
                    return true;
                }
                match book.opened_at {
                    Some(opened_at) if opened_at.elapsed() >= self.config.recovery_timeout => {
                        self.transition_to_half_open(&mut book);
                        true
                    }
                    Some(_) => {
                        book.rejected_count += 1;
                        false
                    }
                    None => {
                        // Open without a timestamp should not happen; allow
                        // the call rather than wedge the dependency shut.
                        warn!(component = %self.name, "Circuit open but no timestamp recorded");
                        true
                    }
                }
            }
            CircuitState::HalfOpen => {
                let mut book = self.book.lock();
                if book.half_open_successes < self.config.success_threshold {
                    true
                } else {
                    book.rejected_count += 1;
                    false
                }
            }
        }
    }

    fn on_success(&self) {
        let mut book = self.book.lock();
        book.total_calls += 1;
        book.success_count += 1;

        debug!(component = %self.name, "🟢 Operation succeeded");

        match self.state() {
            CircuitState::HalfOpen => {
                book.half_open_successes += 1;
                if book.half_open_successes >= self.config.success_threshold {
                    self.transition_to_closed(&mut book);
                }
            }
            CircuitState::Closed => {
                // A success clears the failure window.
                book.failure_times.clear();
            }
            CircuitState::Open => {
                warn!(component = %self.name, "Success recorded while circuit is open");
            }
        }
    }

    fn on_failure(&self) {
        let mut book = self.book.lock();
        let now = Instant::now();
        book.total_calls += 1;
        book.failure_count += 1;
        book.failure_times.push_back(now);

        Self::prune_window(&mut book, now, self.config.monitoring_window);

        error!(
            component = %self.name,
            recent_failures = book.failure_times.len(),
            "🔴 Operation failed"
        );

        match self.state() {
            CircuitState::Closed => {
                if book.failure_times.len() as u32 >= self.config.failure_threshold {
                    self.transition_to_open(&mut book);
                }
            }
            CircuitState::HalfOpen => {
                // A probe failure is not given a second chance.
                self.transition_to_open(&mut book);
            }
            CircuitState::Open => {}
        }
    }

    /// Drop failure timestamps older than the monitoring window.
    fn prune_window(book: &mut BreakerBook, now: Instant, window: Duration) {
        while let Some(oldest) = book.failure_times.front() {
            if now.duration_since(*oldest) > window {
                book.failure_times.pop_front();
            } else {
                break;
            }
        }
    }

    fn transition_to_closed(&self, book: &mut BreakerBook) {
        let from = self.state();
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        book.failure_times.clear();
        book.half_open_successes = 0;
        book.opened_at = None;

        info!(
            component = %self.name,
            total_calls = book.total_calls,
            "🟢 Circuit breaker closed (recovered)"
        );
        self.publish_state_change(from, CircuitState::Closed);
    }

    fn transition_to_open(&self, book: &mut BreakerBook) {
        let from = self.state();
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        book.opened_at = Some(Instant::now());
        book.half_open_successes = 0;

        error!(
            component = %self.name,
            recent_failures = book.failure_times.len(),
            failure_threshold = self.config.failure_threshold,
            recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
        self.publish_state_change(from, CircuitState::Open);
    }

    fn transition_to_half_open(&self, book: &mut BreakerBook) {
        let from = self.state();
        self.state
            .store(CircuitState::HalfOpen as u8, Ordering::Release);
        book.half_open_successes = 0;

        info!(
            component = %self.name,
            success_threshold = self.config.success_threshold,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
        self.publish_state_change(from, CircuitState::HalfOpen);
    }

    fn publish_state_change(&self, from: CircuitState, to: CircuitState) {
        if let Some(events) = &self.events {
            events.publish(
                topics::BREAKER_STATE_CHANGE,
                json!({
                    "component": self.name,
                    "from": from,
                    "to": to,
                }),
            );
        }
    }
}
