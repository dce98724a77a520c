use crate::domain::ports::SlotStoreRef;
use crate::domain::slot::{DaySlotStats, Slot, SlotPatch};
use crate::error::{Result, SettlementError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Date range selector for `aggregate_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsQuery {
    Monthly { year: i32, month: u32 },
    Yearly { year: i32 },
    Custom { from: NaiveDate, to: NaiveDate },
}

/// Enforces non-overlap and temporal validity for an instructor's slots.
///
/// All rejections are synchronous validation or conflict errors with no
/// state change; callers re-submit corrected input, there are no retries.
#[derive(Clone)]
pub struct SlotScheduler {
    slots: SlotStoreRef,
}

impl SlotScheduler {
    pub fn new(slots: SlotStoreRef) -> Self {
        Self { slots }
    }

    pub async fn create_slot(
        &self,
        owner_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        price: Decimal,
    ) -> Result<Slot> {
        validate_interval(start, end)?;
        if price < Decimal::ZERO {
            return Err(SettlementError::Validation(
                "price must not be negative".to_string(),
            ));
        }

        // The store checks the candidate against every existing slot of the
        // owner, booked or not, atomically with the insert: two parallel
        // creates can never both pass the check.
        let slot = Slot::new(owner_id, start, end, price);
        if let Some(other) = self.slots.insert_if_free(slot.clone()).await? {
            return Err(SettlementError::Conflict(format!(
                "slot overlaps existing slot {} ({} - {})",
                other.id, other.start_time, other.end_time
            )));
        }
        tracing::info!(slot_id = %slot.id, owner_id, "slot created");
        Ok(slot)
    }

    pub async fn update_slot(
        &self,
        owner_id: &str,
        slot_id: Uuid,
        patch: SlotPatch,
    ) -> Result<Slot> {
        let mut slot = self
            .slots
            .get(slot_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("slot {slot_id}")))?;
        if slot.owner_id != owner_id {
            return Err(SettlementError::Unauthorized(
                "slot belongs to another instructor".to_string(),
            ));
        }

        let start = patch.start_time.unwrap_or(slot.start_time);
        let end = patch.end_time.unwrap_or(slot.end_time);

        // Only a changed interval triggers temporal validation; the store's
        // conditional update excludes the slot from its own overlap check,
        // so an identical interval never conflicts with itself.
        if start != slot.start_time || end != slot.end_time {
            validate_interval(start, end)?;
        }

        if let Some(price) = patch.price {
            if price < Decimal::ZERO {
                return Err(SettlementError::Validation(
                    "price must not be negative".to_string(),
                ));
            }
            slot.price = price;
        }
        slot.start_time = start;
        slot.end_time = end;

        if let Some(other) = self.slots.update_if_free(slot.clone()).await? {
            return Err(SettlementError::Conflict(format!(
                "slot overlaps existing slot {} ({} - {})",
                other.id, other.start_time, other.end_time
            )));
        }
        Ok(slot)
    }

    /// Removes an unbooked slot. A booked slot is part of a settled booking
    /// and can never be deleted.
    pub async fn delete_slot(&self, owner_id: &str, slot_id: Uuid) -> Result<()> {
        let slot = self
            .slots
            .get(slot_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("slot {slot_id}")))?;
        if slot.owner_id != owner_id {
            return Err(SettlementError::Unauthorized(
                "slot belongs to another instructor".to_string(),
            ));
        }
        if slot.is_booked {
            return Err(SettlementError::Conflict(
                "booked slots cannot be deleted".to_string(),
            ));
        }
        self.slots.remove(slot_id).await
    }

    pub async fn list_slots(&self, owner_id: &str) -> Result<Vec<Slot>> {
        let mut slots = self.slots.list_by_owner(owner_id).await?;
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    /// Buckets the owner's slots by calendar day within the queried range.
    ///
    /// Only days with at least one slot produce a row; rows are sorted by
    /// date.
    pub async fn aggregate_stats(
        &self,
        owner_id: &str,
        query: StatsQuery,
    ) -> Result<Vec<DaySlotStats>> {
        let (from, to) = query.range()?;
        let slots = self.slots.list_by_owner(owner_id).await?;

        let mut buckets: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
        for slot in &slots {
            let day = slot.start_time.date_naive();
            if day < from || day >= to {
                continue;
            }
            let bucket = buckets.entry(day).or_default();
            bucket.0 += 1;
            if slot.is_booked {
                bucket.1 += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(date, (total_slots, booked_slots))| DaySlotStats {
                date,
                total_slots,
                booked_slots,
            })
            .collect())
    }
}

impl StatsQuery {
    /// Resolves the query into a half-open `[from, to)` day range.
    pub fn range(&self) -> Result<(NaiveDate, NaiveDate)> {
        match *self {
            StatsQuery::Monthly { year, month } => {
                let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                    SettlementError::Validation(format!("invalid month {year}-{month}"))
                })?;
                let to = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
                .ok_or_else(|| {
                    SettlementError::Validation(format!("invalid month {year}-{month}"))
                })?;
                Ok((from, to))
            }
            StatsQuery::Yearly { year } => {
                let from = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| SettlementError::Validation(format!("invalid year {year}")))?;
                let to = NaiveDate::from_ymd_opt(year + 1, 1, 1)
                    .ok_or_else(|| SettlementError::Validation(format!("invalid year {year}")))?;
                Ok((from, to))
            }
            StatsQuery::Custom { from, to } => {
                if from >= to {
                    return Err(SettlementError::Validation(
                        "custom range requires from < to".to_string(),
                    ));
                }
                Ok((from, to))
            }
        }
    }
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start <= Utc::now() {
        return Err(SettlementError::Validation(
            "start time must be in the future".to_string(),
        ));
    }
    if end <= start {
        return Err(SettlementError::Validation(
            "end time must be after start time".to_string(),
        ));
    }
    Ok(())
}
