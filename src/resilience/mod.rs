//! # Resilience Module
//!
//! Fault tolerance for the unreliable remote dependencies the storefront
//! depends on: circuit breakers for fault isolation, bounded retries with
//! exponential backoff, failure classification, and the recovery attempt
//! limiter that stops runaway client-side recovery loops.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orderflow_core::resilience::{
//!     CircuitBreaker, CircuitBreakerConfig, RetryExecutor, RetryPolicy,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new("payment_gateway", CircuitBreakerConfig::payment_gateway());
//! let executor = RetryExecutor::new(RetryPolicy::default());
//!
//! let result = executor
//!     .run("verify_payment", &breaker, || async {
//!         // remote call here
//!         Ok::<&str, orderflow_core::payments::GatewayError>("success")
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod recovery_limiter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitBreakerStats, CircuitState};
pub use classifier::{classify_message, Classifiable, ErrorKind};
pub use config::{CircuitBreakerConfig, RetryPolicy};
pub use recovery_limiter::{
    AttemptGate, GateScope, RecoveryAttemptLimiter, RecoveryLimiterConfig,
};
pub use retry::{AttemptFailure, RetryError, RetryExecutor};
