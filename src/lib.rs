#![allow(clippy::doc_markdown)] // Allow technical terms like YAML, UUID in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Orderflow Core
//!
//! Payment reconciliation and order lifecycle core for a storefront that
//! depends on an unreliable third-party payment gateway.
//!
//! ## Overview
//!
//! Customers pay through a hosted gateway and are redirected back with a
//! payment reference. The gateway's verification API fails often enough
//! that naive retry loops amplify outages, so every remote call in this
//! crate flows through a shared resilience stack: circuit breakers with a
//! sliding failure window, bounded exponential-backoff retries, and an
//! attempt limiter that stops runaway client-driven recovery.
//!
//! ## Architecture
//!
//! The crate owns the **decision logic** of reconciliation. External
//! collaborators (the payment gateway, the order store, the delivery
//! availability query) are reached through async traits, so the core can
//! be exercised end to end with in-memory fakes.
//!
//! ## Module Organization
//!
//! - [`resilience`] - Circuit breaker, retry executor, failure classification, recovery limiter
//! - [`payments`] - Payment references, gateway boundary, and the reconciler
//! - [`orders`] - Order/payment states, store interfaces, status state machine
//! - [`delivery`] - Delivery slot capacity and conflict analysis
//! - [`models`] - Shared domain records (orders, delivery slots)
//! - [`events`] - In-process monitoring event stream
//! - [`config`] - Typed configuration with YAML loading and env overrides
//! - [`scheduler`] - Cancellable periodic background tasks
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use orderflow_core::config::ConfigManager;
//! use orderflow_core::events::EventPublisher;
//! use orderflow_core::payments::PaymentReconciler;
//! use orderflow_core::resilience::{
//!     CircuitBreaker, RecoveryAttemptLimiter, RetryExecutor,
//! };
//!
//! # use orderflow_core::orders::OrderStore;
//! # use orderflow_core::payments::PaymentGateway;
//! # async fn example(
//! #     store: Arc<dyn OrderStore>,
//! #     gateway: Arc<dyn PaymentGateway>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let breaker = Arc::new(CircuitBreaker::new(
//!     "payment_gateway",
//!     config.resilience.payment_gateway.to_breaker_config(),
//! ));
//! let retry = RetryExecutor::new(config.resilience.retry.to_policy());
//! let limiter = Arc::new(RecoveryAttemptLimiter::new(
//!     config.recovery.to_limiter_config(),
//! ));
//! let events = EventPublisher::default();
//!
//! let reconciler = PaymentReconciler::new(store, gateway, breaker, retry, limiter, events);
//! let outcome = reconciler
//!     .confirm("order-1", "txn_1690000000_not-a-real-reference", "ORD-1001")
//!     .await?;
//! println!("confirmed: {}", outcome.success);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orders;
pub mod payments;
pub mod resilience;
pub mod scheduler;

pub use config::{ConfigManager, ConfigurationError, OrderflowConfig};
pub use delivery::{DeliverySlotCapacityManager, SlotAnalysis};
pub use error::{OrderflowError, Result};
pub use events::{EventPublisher, MonitoringEvent};
pub use models::{DeliveryTimeSlot, Order};
pub use orders::{OrderStatus, OrderStatusStateMachine, PaymentStatus, TransitionError};
pub use payments::{PaymentReconciler, ReconcileError, ReferenceKind};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RecoveryAttemptLimiter, RetryExecutor,
    RetryPolicy,
};
