use crate::domain::ports::{BookingNotice, MembershipNotice, NotificationSink};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sink that only logs. The real mail/receipt pipeline lives outside the
/// engine.
#[derive(Default, Clone)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for NullSink {
    async fn send_booking_confirmation(&self, notice: BookingNotice) -> Result<()> {
        tracing::info!(
            student_id = %notice.student_id,
            owner_id = %notice.owner_id,
            "booking confirmation queued"
        );
        Ok(())
    }

    async fn send_membership_confirmation(&self, notice: MembershipNotice) -> Result<()> {
        tracing::info!(
            instructor_id = %notice.instructor_id,
            plan = %notice.plan_name,
            "membership confirmation queued"
        );
        Ok(())
    }
}

/// Sink that records every notice, for asserting on delivery in tests.
#[derive(Default, Clone)]
pub struct RecordingSink {
    bookings: Arc<RwLock<Vec<BookingNotice>>>,
    memberships: Arc<RwLock<Vec<MembershipNotice>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn booking_notices(&self) -> Vec<BookingNotice> {
        self.bookings.read().await.clone()
    }

    pub async fn membership_notices(&self) -> Vec<MembershipNotice> {
        self.memberships.read().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_booking_confirmation(&self, notice: BookingNotice) -> Result<()> {
        self.bookings.write().await.push(notice);
        Ok(())
    }

    async fn send_membership_confirmation(&self, notice: MembershipNotice) -> Result<()> {
        self.memberships.write().await.push(notice);
        Ok(())
    }
}
