//! # Payments Module
//!
//! Payment-reference handling, the gateway boundary, and the reconciler
//! that ties verification, idempotent settlement, and the resilience stack
//! together.

pub mod gateway;
pub mod reconciler;
pub mod reference;

pub use gateway::{
    to_minor_units, GatewayError, GatewayPaymentStatus, InitializedPayment, PaymentGateway,
    VerificationOutcome,
};
pub use reconciler::{ConfirmOutcome, PaymentReconciler, ReconcileError, RecoveryOutcome};
pub use reference::{classify_reference, is_valid_reference, ReferenceKind};
