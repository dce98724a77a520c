use super::slot::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Initiated,
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// The record linking a student to a purchased slot.
///
/// A booking references its slot by id only; use `BookingDetail` when the
/// loaded slot is needed. At most one non-cancelled booking exists per slot,
/// and a `Confirmed`+`Paid` booking is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub student_id: String,
    pub owner_id: String,
    pub slot_id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// A settled booking: both rails only ever persist bookings after the
    /// money movement and the slot transition have succeeded.
    pub fn confirmed(
        student_id: impl Into<String>,
        slot: &Slot,
        transaction_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            owner_id: slot.owner_id.clone(),
            slot_id: slot.id,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            transaction_id: transaction_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, principal: &str) -> bool {
        self.student_id == principal || self.owner_id == principal
    }
}

/// A booking with its slot loaded.
///
/// Distinct from `Booking` so callers never have to guess whether a slot
/// reference is an id or a populated record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDetail {
    pub booking: Booking,
    pub slot: Slot,
}
