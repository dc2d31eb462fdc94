//! # Order Store Boundary
//!
//! Narrow interfaces to the backing persistent store and the atomic
//! status-update RPC. The store applies conditional single-row updates and
//! reports concurrent modification with a distinct conflict signal; callers
//! decide whether a conflict is retryable (status updates) or
//! success-equivalent (settlement, where a conflict means another caller
//! already settled the same reference).

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Order;
use crate::orders::OrderStatus;
use crate::resilience::{classify_message, Classifiable, ErrorKind};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// Another actor modified the same row (optimistic/conditional update
    /// failed).
    #[error("concurrent modification conflict")]
    Conflict,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl Classifiable for StoreError {
    fn classification(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::Validation,
            Self::Conflict => ErrorKind::Conflict,
            Self::Backend(message) => classify_message(message),
        }
    }
}

/// Read/write access to orders, scoped to what reconciliation needs.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, StoreError>;

    /// Exact-match lookup against either reference column; the reference may
    /// have been recorded under either field depending on which flow created
    /// it.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError>;

    /// Record the reference minted by the initialize path.
    async fn record_reference(&self, order_id: &str, reference: &str) -> Result<(), StoreError>;

    /// Settlement update, conditional on the order being unpaid. Returns
    /// [`StoreError::Conflict`] when another caller settled first.
    async fn mark_paid(&self, order_id: &str, reference: &str) -> Result<(), StoreError>;
}

/// Atomic "set status" RPC. Business-rule validation happens before this
/// call, not inside it.
#[async_trait]
pub trait StatusUpdater: Send + Sync {
    async fn set_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        acting_admin_id: &str,
    ) -> Result<(), StoreError>;
}
