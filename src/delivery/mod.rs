//! # Delivery Module
//!
//! Read-only capacity and conflict analysis for delivery time slots.

pub mod availability;
pub mod capacity;

pub use availability::{AvailabilityError, AvailabilityProvider};
pub use capacity::{DeliverySlotCapacityManager, SlotAnalysis};
