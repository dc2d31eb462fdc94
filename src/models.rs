//! Closed data model shared across the reconciliation, order-lifecycle, and
//! delivery-capacity subsystems.
//!
//! Remote payloads are validated into these types at the boundary (see
//! [`crate::payments::gateway`]); internal logic never consumes loosely
//! typed values.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::orders::{OrderStatus, PaymentStatus};

/// The subset of an order relevant to reconciliation and lifecycle logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Reference recorded by the initialize path.
    pub payment_reference: Option<String>,
    /// Some older flows recorded the reference under a second column; lookups
    /// must match either.
    pub transaction_reference: Option<String>,
    /// Major currency units.
    pub total_amount: f64,
    pub assigned_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether either reference column matches the given reference exactly.
    pub fn has_reference(&self, reference: &str) -> bool {
        self.payment_reference.as_deref() == Some(reference)
            || self.transaction_reference.as_deref() == Some(reference)
    }

    pub fn has_assigned_agent(&self) -> bool {
        self.assigned_agent.is_some()
    }
}

/// A delivery window with bounded concurrent capacity.
///
/// Refreshed from the external availability query; mutated only by the
/// booking collaborator. This crate observes slots read-only for capacity
/// and conflict analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTimeSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub current_bookings: u32,
    pub is_business_day: bool,
    pub is_holiday: bool,
    /// Availability verdict from the external query.
    pub is_available: bool,
}

impl DeliveryTimeSlot {
    /// `current_bookings / capacity` as a percentage. A zero-capacity slot is
    /// treated as fully booked.
    pub fn utilization_percent(&self) -> f64 {
        if self.capacity == 0 {
            return 100.0;
        }
        (f64::from(self.current_bookings) / f64::from(self.capacity)) * 100.0
    }

    pub fn is_full(&self) -> bool {
        self.current_bookings >= self.capacity
    }

    /// Whether two slots describe the same delivery window.
    pub fn same_window(&self, other: &DeliveryTimeSlot) -> bool {
        self.date == other.date
            && self.start_time == other.start_time
            && self.end_time == other.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(capacity: u32, bookings: u32) -> DeliveryTimeSlot {
        DeliveryTimeSlot {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            capacity,
            current_bookings: bookings,
            is_business_day: true,
            is_holiday: false,
            is_available: true,
        }
    }

    #[test]
    fn test_utilization_percent() {
        assert_eq!(slot(10, 5).utilization_percent(), 50.0);
        assert_eq!(slot(10, 10).utilization_percent(), 100.0);
        assert_eq!(slot(0, 0).utilization_percent(), 100.0);
    }

    #[test]
    fn test_is_full_at_and_over_capacity() {
        assert!(!slot(10, 9).is_full());
        assert!(slot(10, 10).is_full());
        assert!(slot(10, 11).is_full());
        assert!(slot(0, 0).is_full());
    }

    #[test]
    fn test_order_reference_matches_either_column() {
        let order = Order {
            id: "ord-1".to_string(),
            order_number: "ON-1001".to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_reference: Some("txn_1_a".to_string()),
            transaction_reference: Some("pay_1_abc123".to_string()),
            total_amount: 25.0,
            assigned_agent: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(order.has_reference("txn_1_a"));
        assert!(order.has_reference("pay_1_abc123"));
        assert!(!order.has_reference("txn_2_b"));
    }
}
