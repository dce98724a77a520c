use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable instructor time interval with a price.
///
/// Interval semantics are half-open `[start_time, end_time)`. The
/// `is_booked` flag flips through the store's conditional update, never a
/// plain write; only a failed settlement releases it back to unbooked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub owner_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price: Decimal,
    pub is_booked: bool,
}

impl Slot {
    pub fn new(
        owner_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            start_time,
            end_time,
            price,
            is_booked: false,
        }
    }

    /// Two half-open intervals `[s1, e1)` and `[s2, e2)` overlap iff
    /// `s1 < e2 && s2 < e1`. Back-to-back slots do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Partial update for a slot; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
}

/// Per-day slot counts produced by `SlotScheduler::aggregate_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySlotStats {
    pub date: NaiveDate,
    pub total_slots: usize,
    pub booked_slots: usize,
}
