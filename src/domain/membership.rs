use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable membership tier for instructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub duration_days: i64,
    pub is_active: bool,
}

impl MembershipPlan {
    pub fn new(name: impl Into<String>, price: Decimal, duration_days: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            duration_days,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// An instructor's purchase of a membership plan.
///
/// Keyed by `order_ref` (the gateway order reference, or the synthesized
/// wallet transaction id). A `Paid` order is terminal and can never be
/// re-verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipOrder {
    pub id: Uuid,
    pub instructor_id: String,
    pub plan_id: Uuid,
    pub price: Decimal,
    pub payment_status: OrderPaymentStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub order_ref: String,
}

impl MembershipOrder {
    pub fn pending(
        instructor_id: impl Into<String>,
        plan: &MembershipPlan,
        order_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instructor_id: instructor_id.into(),
            plan_id: plan.id,
            price: plan.price,
            payment_status: OrderPaymentStatus::Pending,
            start_date: None,
            end_date: None,
            transaction_id: None,
            order_ref: order_ref.into(),
        }
    }
}

/// An instructor's current membership, as seen by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub plan_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
