use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle states. Closed set; no dynamically added states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Initial state when an order is placed
    Pending,
    /// Order accepted by the store
    Confirmed,
    /// Kitchen / fulfilment is working on the order
    Preparing,
    /// Order is packed and awaiting dispatch
    Ready,
    /// Order is with a delivery agent
    OutForDelivery,
    /// Order reached the customer
    Delivered,
    /// Order was cancelled before fulfilment
    Cancelled,
    /// Payment was returned to the customer
    Refunded,
    /// Order fully closed out
    Completed,
    /// Customer returned the goods
    Returned,
}

impl OrderStatus {
    /// Check if this is a terminal state for routine fulfilment flows
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Cancelled | Self::Refunded | Self::Completed | Self::Returned
        )
    }

    /// Check if the order is actively being fulfilled
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Preparing | Self::Ready | Self::OutForDelivery
        )
    }

    /// All states, in lifecycle order. Useful for admin pickers and tests.
    pub fn all() -> [OrderStatus; 10] {
        [
            Self::Pending,
            Self::Confirmed,
            Self::Preparing,
            Self::Ready,
            Self::OutForDelivery,
            Self::Delivered,
            Self::Cancelled,
            Self::Refunded,
            Self::Completed,
            Self::Returned,
        ]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Preparing => write!(f, "preparing"),
            Self::Ready => write!(f, "ready"),
            Self::OutForDelivery => write!(f, "out_for_delivery"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Refunded => write!(f, "refunded"),
            Self::Completed => write!(f, "completed"),
            Self::Returned => write!(f, "returned"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "completed" => Ok(Self::Completed),
            "returned" => Ok(Self::Returned),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Payment settlement states for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement
    Pending,
    /// Settled; no further verification calls may be dispatched
    Paid,
    /// Settlement reversed
    Refunded,
    /// Gateway reported a terminal failure
    Failed,
}

impl PaymentStatus {
    /// Settled orders are never re-verified (idempotent settlement).
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Refunded => write!(f, "refunded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid payment status: {s}")),
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_terminal_check() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::OutForDelivery.is_terminal());
    }

    #[test]
    fn test_order_status_string_conversion() {
        assert_eq!(OrderStatus::OutForDelivery.to_string(), "out_for_delivery");
        assert_eq!(
            "out_for_delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serde() {
        let status = OrderStatus::OutForDelivery;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");

        let parsed: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn test_payment_status_settled() {
        assert!(PaymentStatus::Paid.is_settled());
        assert!(!PaymentStatus::Pending.is_settled());
        assert!(!PaymentStatus::Failed.is_settled());
        assert!(!PaymentStatus::Refunded.is_settled());
    }

    #[test]
    fn test_all_statuses_round_trip() {
        for status in OrderStatus::all() {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
