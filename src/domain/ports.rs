use super::booking::Booking;
use super::membership::{Membership, MembershipOrder, MembershipPlan, OrderPaymentStatus};
use super::money::Balance;
use super::slot::Slot;
use super::wallet::{Applied, LedgerEntry, WalletAccount};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub type SlotStoreRef = Arc<dyn SlotStore>;
pub type BookingStoreRef = Arc<dyn BookingStore>;
pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type MembershipStoreRef = Arc<dyn MembershipStore>;
pub type InstructorDirectoryRef = Arc<dyn InstructorDirectory>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotificationSinkRef = Arc<dyn NotificationSink>;

/// Persistence for slots, including the conditional booking transition.
///
/// All invariants that matter under concurrency live here, not in the
/// callers: request handlers run in parallel and must not rely on ordering.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Inserts the slot unless it overlaps an existing slot of the same
    /// owner. Check and write run atomically; on conflict the overlapping
    /// slot is returned and nothing is inserted.
    async fn insert_if_free(&self, slot: Slot) -> Result<Option<Slot>>;
    async fn get(&self, slot_id: Uuid) -> Result<Option<Slot>>;
    /// Same conditional write for an existing slot, which is excluded from
    /// its own overlap check.
    async fn update_if_free(&self, slot: Slot) -> Result<Option<Slot>>;
    async fn remove(&self, slot_id: Uuid) -> Result<()>;
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Slot>>;

    /// Atomically transitions the slot from unbooked to booked.
    ///
    /// Returns `false` when the slot was already booked (or missing), which
    /// callers must treat as a definitive "already booked". This is the
    /// compare-and-swap that makes double-booking impossible regardless of
    /// how requests interleave.
    async fn book_if_unbooked(&self, slot_id: Uuid) -> Result<bool>;

    /// Reverts a booked slot to unbooked. Only the orchestrators'
    /// compensation paths call this, after a settlement failed with the
    /// slot already secured.
    async fn release_booking(&self, slot_id: Uuid) -> Result<()>;
}

/// Persistence for booking records.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<()>;
    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>>;
    async fn find_by_slot(&self, slot_id: Uuid) -> Result<Option<Booking>>;
    async fn list_for_principal(&self, principal: &str) -> Result<Vec<Booking>>;
}

/// Append-only wallet ledger storage.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn balance(&self, account_id: &str) -> Result<Balance>;
    async fn entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>>;
    async fn find_entry(&self, account_id: &str, transaction_id: &str)
    -> Result<Option<LedgerEntry>>;

    /// Applies one entry atomically with respect to the target account.
    ///
    /// Serialized per account by the store: a duplicate transaction id
    /// returns the stored outcome with `replayed = true`; a debit exceeding
    /// the balance fails with `InsufficientFunds` and no state change.
    async fn apply(&self, entry: LedgerEntry) -> Result<Applied>;

    /// All known accounts with their current balances.
    async fn accounts(&self) -> Result<Vec<WalletAccount>>;
}

/// Persistence for membership plans and orders.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Rejects a duplicate plan name, compared case-insensitively.
    async fn insert_plan(&self, plan: MembershipPlan) -> Result<()>;
    async fn update_plan(&self, plan: MembershipPlan) -> Result<()>;
    async fn plan(&self, plan_id: Uuid) -> Result<Option<MembershipPlan>>;
    async fn list_plans(&self) -> Result<Vec<MembershipPlan>>;

    async fn insert_order(&self, order: MembershipOrder) -> Result<()>;
    async fn order_by_ref(&self, order_ref: &str) -> Result<Option<MembershipOrder>>;
    async fn list_orders(&self, instructor_id: &str) -> Result<Vec<MembershipOrder>>;

    /// Conditionally settles the order: the pending -> paid transition
    /// succeeds at most once. Returns the settled order, or `None` when the
    /// order was not pending (replay guard).
    async fn settle_order_if_pending(
        &self,
        order_ref: &str,
        status: OrderPaymentStatus,
        transaction_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Option<MembershipOrder>>;
}

/// Narrow view of the instructor directory.
///
/// Membership activation flips instructor state owned by another module;
/// this trait makes that side effect an explicit interface call instead of
/// a hidden write.
#[async_trait]
pub trait InstructorDirectory: Send + Sync {
    async fn membership(&self, instructor_id: &str) -> Result<Option<Membership>>;
    async fn set_membership(&self, instructor_id: &str, membership: Membership) -> Result<()>;
}

/// A remote payment order created for a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub order_ref: String,
    pub amount_minor_units: u64,
    pub currency: String,
}

/// External payment processor, collaborator interface only.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount_minor_units: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder>;

    /// Checks the callback signature over `order_ref|payment_id`.
    fn verify_signature(&self, order_ref: &str, payment_id: &str, signature: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingNotice {
    pub student_id: String,
    pub owner_id: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembershipNotice {
    pub instructor_id: String,
    pub plan_name: String,
    pub expires_at: DateTime<Utc>,
}

/// Receipt/email delivery, fire-and-forget.
///
/// A sink failure is logged by the caller and never rolls back a settled
/// booking or membership.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_booking_confirmation(&self, notice: BookingNotice) -> Result<()>;
    async fn send_membership_confirmation(&self, notice: MembershipNotice) -> Result<()>;
}
