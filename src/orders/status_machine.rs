//! # Order Status State Machine
//!
//! Validates and applies order status transitions under business rules.
//! Validation is a pure function with no side effects; the applying machine
//! calls the external status-update RPC and treats a concurrent-modification
//! conflict as retryable exactly once (another admin may be editing the same
//! order).

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::states::OrderStatus;
use super::store::{OrderStore, StatusUpdater, StoreError};

/// Errors surfaced by the applying machine.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Business-rule violation; never silently coerced.
    #[error("transition to {target} rejected: {reason}")]
    PrerequisiteNotMet { target: OrderStatus, reason: String },

    /// Another actor modified the order and the single retry also conflicted.
    #[error("order {order_id} was modified concurrently")]
    Conflict { order_id: String },

    #[error("order {order_id} no longer exists")]
    OrderGone { order_id: String },

    #[error("status update failed: {0}")]
    Remote(String),
}

/// Result of validating a transition, with a reason when rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCheck {
    pub ok: bool,
    pub reason: Option<String>,
}

impl TransitionCheck {
    fn allowed() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Pure business-rule validation for a status transition.
///
/// Transitions are otherwise unrestricted, but no order may go out for
/// delivery without an assigned delivery agent.
pub fn validate_transition(
    current: OrderStatus,
    next: OrderStatus,
    has_assigned_agent: bool,
) -> TransitionCheck {
    if next == OrderStatus::OutForDelivery && !has_assigned_agent {
        return TransitionCheck::rejected(format!(
            "cannot move from {current} to {next}: order has no assigned delivery agent"
        ));
    }

    TransitionCheck::allowed()
}

/// Applies validated transitions through the external status-update RPC.
pub struct OrderStatusStateMachine {
    store: Arc<dyn OrderStore>,
    updater: Arc<dyn StatusUpdater>,
}

impl OrderStatusStateMachine {
    pub fn new(store: Arc<dyn OrderStore>, updater: Arc<dyn StatusUpdater>) -> Self {
        Self { store, updater }
    }

    /// Validate and apply a transition for the given order.
    ///
    /// On a conflict the order is re-read, re-validated against its fresh
    /// state, and the update retried once; a second conflict is surfaced.
    pub async fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
        acting_admin_id: &str,
    ) -> Result<OrderStatus, TransitionError> {
        let order = self.load_order(order_id).await?;

        self.check(order.status, next, order.has_assigned_agent())?;

        match self.updater.set_status(order_id, next, acting_admin_id).await {
            Ok(()) => {
                info!(order_id, from = %order.status, to = %next, acting_admin_id, "order status updated");
                Ok(next)
            }
            Err(StoreError::Conflict) => {
                debug!(order_id, "status update conflicted; re-reading and retrying once");
                self.retry_after_conflict(order_id, next, acting_admin_id)
                    .await
            }
            Err(other) => Err(TransitionError::Remote(other.to_string())),
        }
    }

    async fn retry_after_conflict(
        &self,
        order_id: &str,
        next: OrderStatus,
        acting_admin_id: &str,
    ) -> Result<OrderStatus, TransitionError> {
        let fresh = self.load_order(order_id).await?;

        // The concurrent edit may have changed what is allowed (for example,
        // the agent may have been unassigned).
        self.check(fresh.status, next, fresh.has_assigned_agent())?;

        match self.updater.set_status(order_id, next, acting_admin_id).await {
            Ok(()) => {
                info!(order_id, from = %fresh.status, to = %next, acting_admin_id, "order status updated after conflict retry");
                Ok(next)
            }
            Err(StoreError::Conflict) => {
                warn!(order_id, to = %next, "status update conflicted twice; surfacing");
                Err(TransitionError::Conflict {
                    order_id: order_id.to_string(),
                })
            }
            Err(other) => Err(TransitionError::Remote(other.to_string())),
        }
    }

    async fn load_order(&self, order_id: &str) -> Result<crate::models::Order, TransitionError> {
        self.store
            .find_by_id(order_id)
            .await
            .map_err(|e| TransitionError::Remote(e.to_string()))?
            .ok_or_else(|| TransitionError::OrderGone {
                order_id: order_id.to_string(),
            })
    }

    fn check(
        &self,
        current: OrderStatus,
        next: OrderStatus,
        has_assigned_agent: bool,
    ) -> Result<(), TransitionError> {
        let check = validate_transition(current, next, has_assigned_agent);
        if check.ok {
            Ok(())
        } else {
            Err(TransitionError::PrerequisiteNotMet {
                target: next,
                reason: check
                    .reason
                    .unwrap_or_else(|| "transition rejected".to_string()),
            })
        }
    }
}
