//! Per-instance settings for circuit breakers and retry execution.
//!
//! Thresholds vary by dependency criticality, so every knob is set per
//! instance; the named constructors capture the presets the storefront and
//! admin surfaces use.

use std::time::Duration;

/// Configuration for a single named circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within `monitoring_window` required to open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before allowing a probe.
    pub recovery_timeout: Duration,
    /// Sliding window for counting failures; older entries are pruned.
    pub monitoring_window: Duration,
    /// Consecutive half-open successes required to close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            success_threshold: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Preset for the payment gateway dependency.
    pub fn payment_gateway() -> Self {
        Self::default()
    }

    /// Stricter preset for auth-adjacent dependencies: trips after two
    /// failures and backs off for a full minute.
    pub fn auth_adjacent() -> Self {
        Self {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
            monitoring_window: Duration::from_secs(120),
            success_threshold: 2,
        }
    }

    /// Preset for dashboard/reporting dependencies where brief staleness is
    /// acceptable.
    pub fn dashboard() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            success_threshold: 1,
        }
    }
}

/// Bounded-retry policy for one remote operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before attempt 2; doubles for each later attempt.
    pub base_delay: Duration,
    /// Per-attempt timeout; a hung attempt counts as a failure.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given 1-based attempt: `base_delay * 2^(attempt-2)`.
    /// Attempt 1 runs immediately.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        self.base_delay * 2u32.pow(exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };

        assert_eq!(policy.backoff_delay(1), Duration::ZERO);
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(400));
    }

    #[test]
    fn test_presets_vary_by_criticality() {
        let auth = CircuitBreakerConfig::auth_adjacent();
        let dashboard = CircuitBreakerConfig::dashboard();

        assert_eq!(auth.failure_threshold, 2);
        assert_eq!(auth.recovery_timeout, Duration::from_secs(60));
        assert_eq!(dashboard.failure_threshold, 3);
        assert_eq!(dashboard.recovery_timeout, Duration::from_secs(30));
    }
}
