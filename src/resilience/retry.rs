//! # Retry Execution
//!
//! Wraps a remote operation with bounded retries, exponential backoff, and a
//! per-attempt timeout, delegating availability checks to a circuit breaker.
//! The breaker's own failure bookkeeping is driven by each underlying
//! attempt (including timeouts), not by the executor.
//!
//! Non-retryable failures (authentication, validation) short-circuit without
//! exhausting attempts. A circuit-open rejection short-circuits as well and
//! surfaces distinctly so callers can render "service degraded" rather than
//! "request failed".

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use super::classifier::{Classifiable, ErrorKind};
use super::config::RetryPolicy;

/// What a single attempt produced when it did not succeed.
#[derive(Debug, Error)]
pub enum AttemptFailure<E> {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Error(E),
}

impl<E: Classifiable> AttemptFailure<E> {
    fn classification(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Error(inner) => inner.classification(),
        }
    }
}

/// Terminal outcome of a retry sequence that did not produce a value.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The circuit breaker rejected the attempt; the dependency is degraded.
    #[error("circuit breaker open for {component}; service degraded")]
    CircuitOpen { component: String },

    /// The failure kind can never succeed on retry; surfaced immediately.
    #[error("non-retryable failure ({kind:?}): {source}")]
    NonRetryable { kind: ErrorKind, source: E },

    /// All attempts were used; carries the last failure observed.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: AttemptFailure<E>,
    },
}

impl<E> RetryError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}

/// Executes operations under a [`RetryPolicy`], gated by a circuit breaker.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` with bounded retries.
    ///
    /// Attempt 1 runs immediately; attempt `n >= 2` waits
    /// `base_delay * 2^(n-2)` first. Every attempt is gated by the breaker
    /// and bounded by the per-attempt timeout; a timed-out attempt counts as
    /// a failure in the breaker's books because the wrapping happens inside
    /// the guarded call.
    pub async fn run<T, E, F, Fut>(
        &self,
        key: &str,
        breaker: &CircuitBreaker,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classifiable + std::error::Error,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let per_attempt_timeout = self.policy.timeout;

        for attempt in 1..=max_attempts {
            let delay = self.policy.backoff_delay(attempt);
            if !delay.is_zero() {
                debug!(key, attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
                sleep(delay).await;
            }

            let attempt_future = operation();
            let result = breaker
                .call(|| async move {
                    match timeout(per_attempt_timeout, attempt_future).await {
                        Ok(inner) => inner.map_err(AttemptFailure::Error),
                        Err(_) => Err(AttemptFailure::Timeout(per_attempt_timeout)),
                    }
                })
                .await;

            let failure = match result {
                Ok(value) => return Ok(value),
                Err(CircuitBreakerError::CircuitOpen { component }) => {
                    warn!(key, attempt, %component, "circuit open, aborting retry sequence");
                    return Err(RetryError::CircuitOpen { component });
                }
                Err(CircuitBreakerError::OperationFailed(failure)) => failure,
            };

            let kind = failure.classification();
            if !kind.is_retryable() {
                warn!(key, attempt, kind = ?kind, error = %failure, "non-retryable failure");
                return match failure {
                    AttemptFailure::Error(source) => {
                        Err(RetryError::NonRetryable { kind, source })
                    }
                    // Timeouts always classify as retryable; unreachable in
                    // practice but exhaustion is the honest mapping.
                    timed_out @ AttemptFailure::Timeout(_) => Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: timed_out,
                    }),
                };
            }

            if attempt >= max_attempts {
                warn!(key, attempts = attempt, error = %failure, "retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            debug!(key, attempt, kind = ?kind, error = %failure, "retryable failure");
        }

        // The loop always returns from its final iteration.
        unreachable!("retry loop exited without a terminal result")
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
