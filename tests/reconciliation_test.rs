//! End-to-end reconciliation scenarios with in-memory collaborators.
//!
//! These tests wire the real reconciler, circuit breaker, retry executor,
//! and attempt limiter against counting fakes to verify the collaboration
//! contracts: verification call counts, fail-fast rejection while the
//! breaker is open, legacy-reference monitoring, and recovery throttling.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use orderflow_core::events::{topics, EventPublisher};
use orderflow_core::models::Order;
use orderflow_core::orders::{OrderStatus, OrderStore, PaymentStatus, StoreError};
use orderflow_core::payments::{GatewayError, PaymentGateway, PaymentReconciler};
use orderflow_core::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RecoveryAttemptLimiter,
    RecoveryLimiterConfig, RetryExecutor, RetryPolicy,
};

const SECURE_REFERENCE: &str = "txn_1690000000_6b46b1ae-24d5-4a53-9a32-9042e7c52a3e";
const LEGACY_REFERENCE: &str = "pay_1690000000_abc123";

fn pending_order(reference: &str) -> Order {
    Order {
        id: "ord-1".to_string(),
        order_number: "ON-1001".to_string(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_reference: Some(reference.to_string()),
        transaction_reference: None,
        total_amount: 42.5,
        assigned_agent: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// In-memory order store that tracks settlement calls and flips the order
/// to paid on a successful `mark_paid`, like the real store would.
struct MemoryStore {
    order: Mutex<Order>,
    mark_paid_calls: AtomicU32,
}

impl MemoryStore {
    fn new(order: Order) -> Self {
        Self {
            order: Mutex::new(order),
            mark_paid_calls: AtomicU32::new(0),
        }
    }

    fn snapshot(&self) -> Order {
        self.order.lock().clone()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        let order = self.order.lock().clone();
        Ok((order.id == order_id).then_some(order))
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError> {
        let order = self.order.lock().clone();
        Ok(order.has_reference(reference).then_some(order))
    }

    async fn record_reference(&self, _order_id: &str, reference: &str) -> Result<(), StoreError> {
        self.order.lock().payment_reference = Some(reference.to_string());
        Ok(())
    }

    async fn mark_paid(&self, _order_id: &str, reference: &str) -> Result<(), StoreError> {
        self.mark_paid_calls.fetch_add(1, Ordering::SeqCst);
        let mut order = self.order.lock();
        if order.payment_status.is_settled() {
            return Err(StoreError::Conflict);
        }
        order.payment_status = PaymentStatus::Paid;
        order.transaction_reference = Some(reference.to_string());
        Ok(())
    }
}

enum GatewayScript {
    Respond(Value),
    Fail,
}

/// Gateway fake driven by a fixed script; counts verification calls.
struct ScriptedGateway {
    script: GatewayScript,
    verify_calls: AtomicU32,
}

impl ScriptedGateway {
    fn succeeding() -> Self {
        Self {
            script: GatewayScript::Respond(json!({
                "status": "success",
                "amount": 4250,
                "paid_at": "2026-08-30T12:00:00Z",
            })),
            verify_calls: AtomicU32::new(0),
        }
    }

    fn reporting(status: &str) -> Self {
        Self {
            script: GatewayScript::Respond(json!({
                "status": status,
                "amount": 4250,
                "paid_at": null,
            })),
            verify_calls: AtomicU32::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            script: GatewayScript::Fail,
            verify_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        _email: &str,
        _amount_minor: i64,
        metadata: Value,
    ) -> Result<Value, GatewayError> {
        Ok(json!({
            "reference": metadata["reference"],
            "authorization_url": "https://pay.example/authorize/abc",
        }))
    }

    async fn verify(&self, _reference: &str) -> Result<Value, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            GatewayScript::Respond(value) => Ok(value.clone()),
            GatewayScript::Fail => Err(GatewayError::Network("connection reset".to_string())),
        }
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<ScriptedGateway>,
    breaker: Arc<CircuitBreaker>,
    events: EventPublisher,
    reconciler: PaymentReconciler,
}

fn harness(order: Order, gateway: ScriptedGateway) -> Harness {
    harness_with_breaker(order, gateway, CircuitBreakerConfig::payment_gateway())
}

fn harness_with_breaker(
    order: Order,
    gateway: ScriptedGateway,
    breaker_config: CircuitBreakerConfig,
) -> Harness {
    let store = Arc::new(MemoryStore::new(order));
    let gateway = Arc::new(gateway);
    let breaker = Arc::new(CircuitBreaker::new("payment_gateway", breaker_config));
    let events = EventPublisher::default();

    let reconciler = PaymentReconciler::new(
        Arc::clone(&store) as Arc<dyn OrderStore>,
        Arc::clone(&gateway) as Arc<dyn PaymentGateway>,
        Arc::clone(&breaker),
        RetryExecutor::new(RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(5),
            timeout: Duration::from_millis(500),
        }),
        Arc::new(RecoveryAttemptLimiter::new(RecoveryLimiterConfig::default())),
        events.clone(),
    );

    Harness {
        store,
        gateway,
        breaker,
        events,
        reconciler,
    }
}

#[tokio::test]
async fn test_pending_order_with_secure_reference_is_confirmed_and_settled() {
    let h = harness(pending_order(SECURE_REFERENCE), ScriptedGateway::succeeding());

    let outcome = h
        .reconciler
        .confirm("ord-1", SECURE_REFERENCE, "ON-1001")
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(h.gateway.verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.mark_paid_calls.load(Ordering::SeqCst), 1);

    let settled = h.store.snapshot();
    assert_eq!(settled.payment_status, PaymentStatus::Paid);
    assert_eq!(
        settled.transaction_reference.as_deref(),
        Some(SECURE_REFERENCE)
    );
}

#[tokio::test]
async fn test_legacy_reference_failed_payment_leaves_order_unpaid() {
    let h = harness(
        pending_order(LEGACY_REFERENCE),
        ScriptedGateway::reporting("failed"),
    );
    let mut monitoring = h.events.subscribe();

    let outcome = h
        .reconciler
        .confirm("ord-1", LEGACY_REFERENCE, "ON-1001")
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.message.contains("failed"));
    assert_eq!(h.store.mark_paid_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.snapshot().payment_status, PaymentStatus::Pending);

    // The legacy reference fires exactly one monitoring event, regardless
    // of how many verification attempts ran underneath.
    let event = monitoring.try_recv().expect("legacy event should be published");
    assert_eq!(event.name, topics::LEGACY_REFERENCE);
    assert_eq!(event.context["reference"], LEGACY_REFERENCE);
    assert!(monitoring.try_recv().is_err());
}

#[tokio::test]
async fn test_open_breaker_rejects_confirmation_without_contacting_gateway() {
    let h = harness_with_breaker(
        pending_order(SECURE_REFERENCE),
        ScriptedGateway::failing(),
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            success_threshold: 1,
        },
    );

    // Two confirmations at two attempts each produce four gateway failures,
    // tripping the breaker at the third.
    for _ in 0..2 {
        let outcome = h
            .reconciler
            .confirm("ord-1", SECURE_REFERENCE, "ON-1001")
            .await
            .unwrap();
        assert!(!outcome.success);
    }
    assert_eq!(h.breaker.state(), CircuitState::Open);
    let calls_while_closed = h.gateway.verify_calls.load(Ordering::SeqCst);

    let outcome = h
        .reconciler
        .confirm("ord-1", SECURE_REFERENCE, "ON-1001")
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.message.contains("temporarily degraded"));
    // Rejected fast: no additional gateway traffic.
    assert_eq!(
        h.gateway.verify_calls.load(Ordering::SeqCst),
        calls_while_closed
    );
}

#[tokio::test]
async fn test_recovery_is_throttled_after_repeated_attempts() {
    let h = harness(pending_order(SECURE_REFERENCE), ScriptedGateway::reporting("pending"));

    for _ in 0..3 {
        let outcome = h.reconciler.attempt_recovery(SECURE_REFERENCE).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.retry_after.is_none());
    }

    let blocked = h.reconciler.attempt_recovery(SECURE_REFERENCE).await.unwrap();
    assert!(!blocked.success);
    let retry_after = blocked.retry_after.expect("blocked attempt reports cooldown");
    assert!(retry_after <= Duration::from_secs(300));
    assert!(retry_after > Duration::ZERO);
    assert!(blocked.message.contains("Too many recovery attempts"));

    // The blocked attempt never reached the gateway.
    assert_eq!(h.gateway.verify_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_successful_recovery_settles_and_publishes_event() {
    let h = harness(pending_order(SECURE_REFERENCE), ScriptedGateway::succeeding());
    let mut monitoring = h.events.subscribe();

    let outcome = h.reconciler.attempt_recovery(SECURE_REFERENCE).await.unwrap();

    assert!(outcome.success);
    assert!(!outcome.already_paid);
    assert_eq!(h.store.snapshot().payment_status, PaymentStatus::Paid);

    let event = monitoring.try_recv().expect("recovery event should be published");
    assert_eq!(event.name, topics::PAYMENT_RECOVERED);
    assert_eq!(event.context["order_id"], "ord-1");
}

#[tokio::test]
async fn test_concurrent_confirmations_settle_exactly_once() {
    let h = harness(pending_order(SECURE_REFERENCE), ScriptedGateway::succeeding());

    let first = h
        .reconciler
        .confirm("ord-1", SECURE_REFERENCE, "ON-1001")
        .await
        .unwrap();
    // Second caller races in after settlement; the already-paid short
    // circuit answers without another gateway round trip.
    let second = h
        .reconciler
        .confirm("ord-1", SECURE_REFERENCE, "ON-1001")
        .await
        .unwrap();

    assert!(first.success);
    assert!(second.success);
    assert!(second.message.contains("already paid"));
    assert_eq!(h.gateway.verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.mark_paid_calls.load(Ordering::SeqCst), 1);
}
