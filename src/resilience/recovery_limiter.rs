//! # Recovery Attempt Limiter
//!
//! Per-order bounded-retry guard that stops runaway recovery loops
//! independently of the circuit breaker. Two gates must pass:
//!
//! - the per-order gate: at most `max_attempts` within the cooldown window,
//!   with the record evicted once the cooldown expires or on confirmed
//!   success;
//! - the global emergency gate: a platform-wide counter with its own
//!   threshold, plus a manual trip switch, so an incident can be stopped in
//!   one place without iterating every order's record.
//!
//! State lives in process memory scoped to one running client instance. It
//! is a guard against a user's own runaway loops, not a substitute for
//! server-side rate limiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Limiter thresholds. The emergency tier counts every attempt regardless of
/// order, so its threshold is higher but platform-wide.
#[derive(Debug, Clone)]
pub struct RecoveryLimiterConfig {
    pub max_attempts: u32,
    pub cooldown: Duration,
    pub emergency_max_attempts: u32,
    pub emergency_cooldown: Duration,
}

impl Default for RecoveryLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown: Duration::from_secs(300),
            emergency_max_attempts: 20,
            emergency_cooldown: Duration::from_secs(120),
        }
    }
}

/// Whether an attempt may proceed, and if not, how long to wait.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptGate {
    Allowed,
    Blocked {
        retry_after: Duration,
        scope: GateScope,
    },
}

impl AttemptGate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Which tier vetoed the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateScope {
    Order,
    Emergency,
}

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    attempts: u32,
    last_attempt: Instant,
}

/// Bounded in-memory attempt tracking, keyed per order id.
#[derive(Debug)]
pub struct RecoveryAttemptLimiter {
    config: RecoveryLimiterConfig,
    records: DashMap<String, AttemptRecord>,
    global: Mutex<Option<AttemptRecord>>,
    tripped: AtomicBool,
}

impl RecoveryAttemptLimiter {
    pub fn new(config: RecoveryLimiterConfig) -> Self {
        Self {
            config,
            records: DashMap::new(),
            global: Mutex::new(None),
            tripped: AtomicBool::new(false),
        }
    }

    /// Check both gates for the given order. Expired records are evicted as a
    /// side effect, which keeps the map bounded by active offenders.
    pub fn check(&self, order_id: &str) -> AttemptGate {
        if self.tripped.load(Ordering::Acquire) {
            warn!(order_id, "recovery attempt vetoed: emergency stop is tripped");
            return AttemptGate::Blocked {
                retry_after: self.config.emergency_cooldown,
                scope: GateScope::Emergency,
            };
        }

        if let Some(retry_after) = self.order_gate_blocked(order_id) {
            return AttemptGate::Blocked {
                retry_after,
                scope: GateScope::Order,
            };
        }

        if let Some(retry_after) = self.emergency_gate_blocked() {
            warn!(order_id, "recovery attempt vetoed by the platform-wide gate");
            return AttemptGate::Blocked {
                retry_after,
                scope: GateScope::Emergency,
            };
        }

        AttemptGate::Allowed
    }

    /// Record one attempt against both tiers.
    pub fn record_attempt(&self, order_id: &str) {
        let now = Instant::now();

        let mut entry = self
            .records
            .entry(order_id.to_string())
            .or_insert(AttemptRecord {
                attempts: 0,
                last_attempt: now,
            });
        entry.attempts += 1;
        entry.last_attempt = now;
        let attempts = entry.attempts;
        drop(entry);

        let mut global = self.global.lock();
        match global.as_mut() {
            Some(record) if now.duration_since(record.last_attempt) <= self.config.emergency_cooldown => {
                record.attempts += 1;
                record.last_attempt = now;
            }
            _ => {
                *global = Some(AttemptRecord {
                    attempts: 1,
                    last_attempt: now,
                });
            }
        }

        debug!(order_id, attempts, "recorded recovery attempt");
    }

    /// Number of attempts currently on record for an order.
    pub fn attempts(&self, order_id: &str) -> u32 {
        self.records.get(order_id).map_or(0, |r| r.attempts)
    }

    /// Clear an order's record (called on confirmed success).
    pub fn reset(&self, order_id: &str) {
        self.records.remove(order_id);
    }

    /// Manually veto all attempts until [`clear`](Self::clear) is called.
    pub fn trip(&self) {
        warn!("🚨 recovery emergency stop tripped");
        self.tripped.store(true, Ordering::Release);
    }

    /// Release the manual veto and forget the global window.
    pub fn clear(&self) {
        self.tripped.store(false, Ordering::Release);
        *self.global.lock() = None;
    }

    fn order_gate_blocked(&self, order_id: &str) -> Option<Duration> {
        let record = match self.records.get(order_id) {
            Some(record) => *record,
            None => return None,
        };

        let elapsed = record.last_attempt.elapsed();
        if elapsed > self.config.cooldown {
            // Record went stale, whether or not it ever hit the threshold;
            // evict so the map stays bounded by active offenders and the
            // counter restarts from zero.
            self.records.remove(order_id);
            return None;
        }

        if record.attempts < self.config.max_attempts {
            None
        } else {
            Some(self.config.cooldown - elapsed)
        }
    }

    fn emergency_gate_blocked(&self) -> Option<Duration> {
        let mut global = self.global.lock();
        let record = (*global)?;

        let elapsed = record.last_attempt.elapsed();
        if elapsed > self.config.emergency_cooldown {
            *global = None;
            return None;
        }

        if record.attempts >= self.config.emergency_max_attempts {
            Some(self.config.emergency_cooldown - elapsed)
        } else {
            None
        }
    }
}

impl Default for RecoveryAttemptLimiter {
    fn default() -> Self {
        Self::new(RecoveryLimiterConfig::default())
    }
}
