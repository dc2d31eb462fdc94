//! # Delivery Slot Capacity Analysis
//!
//! Computes slot utilization, flags full or conflicted slots, and supplies
//! reschedule recommendations. Consumed by both storefront booking and admin
//! schedule recovery so both reach the same verdict from one source of
//! truth. This component performs no writes.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::availability::{AvailabilityError, AvailabilityProvider};
use crate::models::DeliveryTimeSlot;

/// Utilization above this percentage produces a "nearly full" warning.
const NEARLY_FULL_PERCENT: f64 = 80.0;

/// Verdict and guidance for one requested slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotAnalysis {
    /// The slot is unavailable or absent from the current availability set.
    pub is_conflicted: bool,
    pub current_capacity: u32,
    pub total_capacity: u32,
    pub utilization_percentage: f64,
    pub is_slot_full: bool,
    pub recommendations: Vec<String>,
}

/// Read-only capacity and conflict analysis over the availability query.
pub struct DeliverySlotCapacityManager {
    availability: Arc<dyn AvailabilityProvider>,
}

impl DeliverySlotCapacityManager {
    pub fn new(availability: Arc<dyn AvailabilityProvider>) -> Self {
        Self { availability }
    }

    /// Fetch current availability for the requested slot's date and analyze
    /// the slot against it.
    pub async fn analyze_requested(
        &self,
        requested: &DeliveryTimeSlot,
    ) -> Result<SlotAnalysis, AvailabilityError> {
        let available = self
            .availability
            .fetch_slots(requested.date, requested.date)
            .await?;
        Ok(Self::analyze(requested, &available))
    }

    /// Pure analysis of a requested slot against an availability set.
    ///
    /// A slot missing from the set is treated as "no longer available" - the
    /// most conservative interpretation.
    pub fn analyze(requested: &DeliveryTimeSlot, available: &[DeliveryTimeSlot]) -> SlotAnalysis {
        let current = available.iter().find(|s| s.same_window(requested));

        // Prefer the fresh numbers when the availability set knows the slot.
        let slot = current.unwrap_or(requested);
        let is_conflicted = match current {
            Some(fresh) => !fresh.is_available,
            None => true,
        };

        let is_slot_full = slot.is_full();
        let utilization = slot.utilization_percent();

        let mut recommendations = Vec::new();
        if is_conflicted {
            recommendations
                .push("This slot is no longer available. Please choose another time.".to_string());
        }
        if is_slot_full {
            recommendations
                .push("This slot is fully booked. Please choose another time.".to_string());
        } else if utilization > NEARLY_FULL_PERCENT {
            recommendations.push(
                "This slot is nearly full. Book soon or consider a different time.".to_string(),
            );
        }
        if slot.is_holiday {
            recommendations.push(
                "The selected date is a holiday. Consider rescheduling to a business day."
                    .to_string(),
            );
        } else if !slot.is_business_day {
            recommendations.push(
                "The selected date is not a business day. Consider rescheduling.".to_string(),
            );
        }

        debug!(
            date = %slot.date,
            bookings = slot.current_bookings,
            capacity = slot.capacity,
            is_conflicted,
            is_slot_full,
            "analyzed delivery slot"
        );

        SlotAnalysis {
            is_conflicted,
            current_capacity: slot.current_bookings,
            total_capacity: slot.capacity,
            utilization_percentage: utilization,
            is_slot_full,
            recommendations,
        }
    }

    /// Rank open business-day slots in the range by utilization, lowest
    /// first, as reschedule suggestions.
    pub async fn recommend_alternatives(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DeliveryTimeSlot>, AvailabilityError> {
        let mut candidates: Vec<DeliveryTimeSlot> = self
            .availability
            .fetch_slots(start, end)
            .await?
            .into_iter()
            .filter(|s| s.is_available && s.is_business_day && !s.is_holiday && !s.is_full())
            .collect();

        candidates.sort_by(|a, b| {
            a.utilization_percent()
                .partial_cmp(&b.utilization_percent())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.date.cmp(&b.date))
                .then(a.start_time.cmp(&b.start_time))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use proptest::prelude::*;

    fn slot(date: (i32, u32, u32), start_hour: u32, capacity: u32, bookings: u32) -> DeliveryTimeSlot {
        DeliveryTimeSlot {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start_time: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(start_hour + 2, 0, 0).unwrap(),
            capacity,
            current_bookings: bookings,
            is_business_day: true,
            is_holiday: false,
            is_available: true,
        }
    }

    #[test]
    fn test_missing_slot_is_conflicted() {
        let requested = slot((2024, 6, 3), 10, 10, 0);
        let analysis = DeliverySlotCapacityManager::analyze(&requested, &[]);

        assert!(analysis.is_conflicted);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("no longer available")));
    }

    #[test]
    fn test_unavailable_slot_is_conflicted() {
        let requested = slot((2024, 6, 3), 10, 10, 0);
        let mut fresh = requested.clone();
        fresh.is_available = false;

        let analysis = DeliverySlotCapacityManager::analyze(&requested, &[fresh]);
        assert!(analysis.is_conflicted);
    }

    #[test]
    fn test_open_slot_is_clean() {
        let requested = slot((2024, 6, 3), 10, 10, 3);
        let analysis =
            DeliverySlotCapacityManager::analyze(&requested, std::slice::from_ref(&requested));

        assert!(!analysis.is_conflicted);
        assert!(!analysis.is_slot_full);
        assert_eq!(analysis.utilization_percentage, 30.0);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_fresh_numbers_win_over_requested_snapshot() {
        let requested = slot((2024, 6, 3), 10, 10, 0);
        let fresh = slot((2024, 6, 3), 10, 10, 10);

        let analysis = DeliverySlotCapacityManager::analyze(&requested, &[fresh]);
        assert!(analysis.is_slot_full);
        assert_eq!(analysis.current_capacity, 10);
    }

    #[test]
    fn test_nearly_full_band() {
        let requested = slot((2024, 6, 3), 10, 10, 9);
        let analysis =
            DeliverySlotCapacityManager::analyze(&requested, std::slice::from_ref(&requested));

        assert!(!analysis.is_slot_full);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("nearly full")));
    }

    #[test]
    fn test_holiday_always_recommends_rescheduling() {
        let mut requested = slot((2024, 12, 25), 10, 10, 0);
        requested.is_holiday = true;

        let analysis =
            DeliverySlotCapacityManager::analyze(&requested, std::slice::from_ref(&requested));
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("holiday")));
    }

    #[test]
    fn test_non_business_day_recommends_rescheduling() {
        let mut requested = slot((2024, 6, 2), 10, 10, 0);
        requested.is_business_day = false;

        let analysis =
            DeliverySlotCapacityManager::analyze(&requested, std::slice::from_ref(&requested));
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("not a business day")));
    }

    proptest! {
        #[test]
        fn prop_full_slots_are_never_reported_open(capacity in 0u32..1000, bookings in 0u32..2000) {
            let mut requested = slot((2024, 6, 3), 10, capacity, bookings);
            requested.current_bookings = bookings;

            let analysis =
                DeliverySlotCapacityManager::analyze(&requested, std::slice::from_ref(&requested));
            if bookings >= capacity {
                prop_assert!(analysis.is_slot_full);
            } else {
                prop_assert!(!analysis.is_slot_full);
            }
        }
    }

    struct FixedAvailability {
        slots: Vec<DeliveryTimeSlot>,
    }

    #[async_trait]
    impl AvailabilityProvider for FixedAvailability {
        async fn fetch_slots(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DeliveryTimeSlot>, AvailabilityError> {
            Ok(self.slots.clone())
        }
    }

    #[tokio::test]
    async fn test_recommend_alternatives_ranks_by_utilization() {
        let mut holiday = slot((2024, 6, 5), 10, 10, 0);
        holiday.is_holiday = true;

        let provider = Arc::new(FixedAvailability {
            slots: vec![
                slot((2024, 6, 3), 10, 10, 8),
                slot((2024, 6, 3), 14, 10, 2),
                slot((2024, 6, 4), 10, 10, 10), // full, excluded
                holiday,                        // holiday, excluded
            ],
        });
        let manager = DeliverySlotCapacityManager::new(provider);

        let alternatives = manager
            .recommend_alternatives(
                NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
                5,
            )
            .await
            .unwrap();

        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].current_bookings, 2);
        assert_eq!(alternatives[1].current_bookings, 8);
    }
}
