//! # Payment Reconciler
//!
//! Resolves a payment reference to its owning order, short-circuits when
//! already settled, otherwise verifies through the retry executor and
//! circuit breaker, and applies an idempotent settlement update.
//!
//! Verification and settlement are two separate remote calls; the re-check
//! against `payment_status` guards the common race, and the store's own
//! conditional update enforces exactly-once settlement. A conflict response
//! from the settlement update therefore means another caller already settled
//! the same reference and is treated as success-equivalent.
//!
//! Expected failure modes come back as result structs so callers can present
//! a recoverable message; only programmer errors (malformed reference,
//! unknown order) surface as typed errors.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::gateway::{
    to_minor_units, GatewayError, InitializedPayment, PaymentGateway, VerificationOutcome,
};
use super::reference::{classify_reference, mint_reference, ReferenceKind};
use crate::events::{topics, EventPublisher};
use crate::models::Order;
use crate::orders::{OrderStore, StoreError};
use crate::resilience::{
    AttemptGate, CircuitBreaker, ErrorKind, RecoveryAttemptLimiter, RetryError, RetryExecutor,
};

/// Fail-fast errors for conditions a caller could have validated.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("payment reference is missing or malformed: {reference:?}")]
    InvalidReference { reference: String },

    #[error("no order found for {lookup}")]
    OrderNotFound { lookup: String },

    #[error("payment initialization failed: {0}")]
    InitializationFailed(String),

    #[error("store error during reconciliation: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of a user-facing confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    pub success: bool,
    pub message: String,
}

/// Outcome of a recovery attempt.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub success: bool,
    /// True when the order was settled before this attempt ran.
    pub already_paid: bool,
    /// Remaining cooldown when the attempt limiter blocked the attempt.
    pub retry_after: Option<Duration>,
    pub message: String,
}

/// Reconciles payments against orders through the resilience stack.
///
/// All collaborators are constructor-injected so tests can compose isolated
/// instances; there is no ambient global state.
pub struct PaymentReconciler {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryExecutor,
    limiter: Arc<RecoveryAttemptLimiter>,
    events: EventPublisher,
}

impl PaymentReconciler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryExecutor,
        limiter: Arc<RecoveryAttemptLimiter>,
        events: EventPublisher,
    ) -> Self {
        Self {
            store,
            gateway,
            breaker,
            retry,
            limiter,
            events,
        }
    }

    /// Start a payment for an order. This is the only path that mints
    /// references.
    pub async fn initialize_payment(
        &self,
        order_id: &str,
        email: &str,
        amount_major: f64,
        metadata: Value,
    ) -> Result<InitializedPayment, ReconcileError> {
        let reference = mint_reference();
        let amount_minor = to_minor_units(amount_major);

        let mut metadata = match metadata {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("context".to_string(), other);
                map
            }
        };
        metadata.insert("reference".to_string(), json!(reference));
        metadata.insert("order_id".to_string(), json!(order_id));

        let gateway = Arc::clone(&self.gateway);
        let email = email.to_string();
        let metadata = Value::Object(metadata);

        let payload = self
            .retry
            .run("payment_initialize", &self.breaker, || {
                let gateway = Arc::clone(&gateway);
                let email = email.clone();
                let metadata = metadata.clone();
                async move { gateway.initialize(&email, amount_minor, metadata).await }
            })
            .await
            .map_err(|e| ReconcileError::InitializationFailed(e.to_string()))?;

        let initialized = InitializedPayment::from_value(&payload)
            .map_err(|e| ReconcileError::InitializationFailed(e.to_string()))?;

        self.store
            .record_reference(order_id, &initialized.reference)
            .await?;

        info!(
            order_id,
            reference = %initialized.reference,
            amount_minor,
            "payment initialized"
        );
        Ok(initialized)
    }

    /// Confirm a payment the customer just completed.
    pub async fn confirm(
        &self,
        order_id: &str,
        reference: &str,
        order_number: &str,
    ) -> Result<ConfirmOutcome, ReconcileError> {
        self.require_valid_reference(reference)?;

        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ReconcileError::OrderNotFound {
                lookup: format!("order id {order_id}"),
            })?;

        if order.payment_status.is_settled() {
            debug!(order_id, reference, "order already settled; skipping verification");
            return Ok(ConfirmOutcome {
                success: true,
                message: format!("Order {order_number} is already paid."),
            });
        }

        self.note_legacy_reference(reference, &order.id);

        match self.verify_via_gateway(reference).await {
            Ok(outcome) if outcome.status.is_success() => {
                self.settle(&order, reference).await?;
                Ok(ConfirmOutcome {
                    success: true,
                    message: format!("Payment confirmed for order {order_number}."),
                })
            }
            Ok(outcome) => {
                warn!(
                    order_id,
                    reference,
                    status = outcome.status.as_str(),
                    "gateway did not report success"
                );
                Ok(ConfirmOutcome {
                    success: false,
                    message: format!(
                        "Payment for order {order_number} is {}; it has not been charged.",
                        outcome.status.as_str()
                    ),
                })
            }
            Err(error) => Ok(ConfirmOutcome {
                success: false,
                message: self.describe_verification_failure(&order, reference, &error),
            }),
        }
    }

    /// Recover an order whose payment outcome was lost (closed tab, webhook
    /// miss). Gated by the attempt limiter on both tiers.
    pub async fn attempt_recovery(
        &self,
        reference: &str,
    ) -> Result<RecoveryOutcome, ReconcileError> {
        self.require_valid_reference(reference)?;

        let order = self
            .store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| ReconcileError::OrderNotFound {
                lookup: format!("payment reference {reference}"),
            })?;

        if order.payment_status.is_settled() {
            debug!(order_id = %order.id, reference, "already paid; no gateway call dispatched");
            return Ok(RecoveryOutcome {
                success: true,
                already_paid: true,
                retry_after: None,
                message: "Payment was already confirmed.".to_string(),
            });
        }

        if let AttemptGate::Blocked { retry_after, scope } = self.limiter.check(&order.id) {
            warn!(
                order_id = %order.id,
                reference,
                attempts = self.limiter.attempts(&order.id),
                scope = ?scope,
                retry_after_secs = retry_after.as_secs(),
                "recovery attempt blocked"
            );
            return Ok(RecoveryOutcome {
                success: false,
                already_paid: false,
                retry_after: Some(retry_after),
                message: format!(
                    "Too many recovery attempts. Please wait {} seconds and try again.",
                    retry_after.as_secs().max(1)
                ),
            });
        }

        self.limiter.record_attempt(&order.id);
        self.note_legacy_reference(reference, &order.id);

        match self.verify_via_gateway(reference).await {
            Ok(outcome) if outcome.status.is_success() => {
                self.settle(&order, reference).await?;
                self.limiter.reset(&order.id);
                self.events.publish(
                    topics::PAYMENT_RECOVERED,
                    json!({
                        "order_id": order.id,
                        "order_number": order.order_number,
                        "reference": reference,
                    }),
                );
                info!(order_id = %order.id, reference, "payment recovered");
                Ok(RecoveryOutcome {
                    success: true,
                    already_paid: false,
                    retry_after: None,
                    message: format!("Payment recovered for order {}.", order.order_number),
                })
            }
            Ok(outcome) => {
                warn!(
                    order_id = %order.id,
                    reference,
                    attempts = self.limiter.attempts(&order.id),
                    status = outcome.status.as_str(),
                    "recovery verification did not report success"
                );
                Ok(RecoveryOutcome {
                    success: false,
                    already_paid: false,
                    retry_after: None,
                    message: format!(
                        "The gateway reports this payment as {}.",
                        outcome.status.as_str()
                    ),
                })
            }
            Err(error) => {
                warn!(
                    order_id = %order.id,
                    reference,
                    attempts = self.limiter.attempts(&order.id),
                    error = %error,
                    "recovery verification failed"
                );
                Ok(RecoveryOutcome {
                    success: false,
                    already_paid: false,
                    retry_after: None,
                    message: self.describe_verification_failure(&order, reference, &error),
                })
            }
        }
    }

    fn require_valid_reference(&self, reference: &str) -> Result<(), ReconcileError> {
        if reference.is_empty() || classify_reference(reference) == ReferenceKind::Invalid {
            return Err(ReconcileError::InvalidReference {
                reference: reference.to_string(),
            });
        }
        Ok(())
    }

    /// Verify through the retry executor and circuit breaker, validating the
    /// payload at the boundary.
    async fn verify_via_gateway(
        &self,
        reference: &str,
    ) -> Result<VerificationOutcome, RetryError<GatewayError>> {
        let gateway = Arc::clone(&self.gateway);
        let reference = reference.to_string();

        let payload = self
            .retry
            .run("payment_verify", &self.breaker, || {
                let gateway = Arc::clone(&gateway);
                let reference = reference.clone();
                async move { gateway.verify(&reference).await }
            })
            .await?;

        VerificationOutcome::from_value(&payload).map_err(|source| RetryError::NonRetryable {
            kind: ErrorKind::Validation,
            source,
        })
    }

    /// Apply the settlement update. A conflict means another caller settled
    /// the same reference first, which is the outcome we wanted.
    async fn settle(&self, order: &Order, reference: &str) -> Result<(), ReconcileError> {
        match self.store.mark_paid(&order.id, reference).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict) => {
                info!(
                    order_id = %order.id,
                    reference,
                    "settlement conflict; another caller already settled this reference"
                );
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Deprecation-tracking signal for client-minted references. Fires once
    /// per verification path, not per retry attempt, and never blocks.
    fn note_legacy_reference(&self, reference: &str, order_id: &str) {
        if classify_reference(reference) == ReferenceKind::Legacy {
            info!(order_id, reference, "legacy payment reference in use");
            self.events.publish(
                topics::LEGACY_REFERENCE,
                json!({
                    "order_id": order_id,
                    "reference": reference,
                }),
            );
        }
    }

    fn describe_verification_failure(
        &self,
        order: &Order,
        reference: &str,
        error: &RetryError<GatewayError>,
    ) -> String {
        if error.is_circuit_open() {
            warn!(
                order_id = %order.id,
                reference,
                "verification rejected: payment service degraded"
            );
            "The payment service is temporarily degraded. Please try again shortly.".to_string()
        } else {
            warn!(order_id = %order.id, reference, error = %error, "verification failed");
            format!("Payment verification failed: {error}")
        }
    }
}
