//! Narrow interface to the external slot-availability query.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::DeliveryTimeSlot;
use crate::resilience::{classify_message, Classifiable, ErrorKind};

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("availability query failed: {0}")]
    Query(String),
}

impl Classifiable for AvailabilityError {
    fn classification(&self) -> ErrorKind {
        match self {
            Self::Query(message) => classify_message(message),
        }
    }
}

/// Source of truth for delivery-slot capacity over a date range.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    async fn fetch_slots(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DeliveryTimeSlot>, AvailabilityError>;
}
