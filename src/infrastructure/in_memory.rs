use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::membership::{Membership, MembershipOrder, MembershipPlan, OrderPaymentStatus};
use crate::domain::money::Balance;
use crate::domain::ports::{
    BookingStore, InstructorDirectory, MembershipStore, SlotStore, WalletStore,
};
use crate::domain::slot::Slot;
use crate::domain::wallet::{Applied, LedgerEntry, WalletAccount};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory slot store.
///
/// The booked transition runs under the write lock, which makes
/// `book_if_unbooked` the compare-and-swap the orchestrators rely on.
#[derive(Default, Clone)]
pub struct InMemorySlotStore {
    slots: Arc<RwLock<HashMap<Uuid, Slot>>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The candidate's owner-scoped overlap probe, excluding the candidate
/// itself so updates never conflict with their own stored interval.
fn overlapping<'a>(slots: &'a HashMap<Uuid, Slot>, candidate: &Slot) -> Option<&'a Slot> {
    slots.values().find(|s| {
        s.owner_id == candidate.owner_id
            && s.id != candidate.id
            && s.overlaps(candidate.start_time, candidate.end_time)
    })
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn insert_if_free(&self, slot: Slot) -> Result<Option<Slot>> {
        let mut slots = self.slots.write().await;
        if let Some(other) = overlapping(&slots, &slot) {
            return Ok(Some(other.clone()));
        }
        slots.insert(slot.id, slot);
        Ok(None)
    }

    async fn get(&self, slot_id: Uuid) -> Result<Option<Slot>> {
        let slots = self.slots.read().await;
        Ok(slots.get(&slot_id).cloned())
    }

    async fn update_if_free(&self, slot: Slot) -> Result<Option<Slot>> {
        let mut slots = self.slots.write().await;
        if let Some(other) = overlapping(&slots, &slot) {
            return Ok(Some(other.clone()));
        }
        match slots.get_mut(&slot.id) {
            Some(stored) => {
                *stored = slot;
                Ok(None)
            }
            None => Err(SettlementError::NotFound(format!("slot {}", slot.id))),
        }
    }

    async fn remove(&self, slot_id: Uuid) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots
            .remove(&slot_id)
            .map(|_| ())
            .ok_or_else(|| SettlementError::NotFound(format!("slot {slot_id}")))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Slot>> {
        let slots = self.slots.read().await;
        Ok(slots
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn book_if_unbooked(&self, slot_id: Uuid) -> Result<bool> {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&slot_id) {
            Some(slot) if !slot.is_booked => {
                slot.is_booked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_booking(&self, slot_id: Uuid) -> Result<()> {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&slot_id) {
            Some(slot) => {
                slot.is_booked = false;
                Ok(())
            }
            None => Err(SettlementError::NotFound(format!("slot {slot_id}"))),
        }
    }
}

/// A thread-safe in-memory booking store.
#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&booking_id).cloned())
    }

    async fn find_by_slot(&self, slot_id: Uuid) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .find(|b| b.slot_id == slot_id && b.status != BookingStatus::Cancelled)
            .cloned())
    }

    async fn list_for_principal(&self, principal: &str) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut matched: Vec<Booking> = bookings
            .values()
            .filter(|b| b.involves(principal))
            .cloned()
            .collect();
        matched.sort_by_key(|b| b.created_at);
        Ok(matched)
    }
}

#[derive(Default, Debug, Clone)]
struct AccountState {
    balance: Balance,
    entries: Vec<LedgerEntry>,
}

/// A thread-safe in-memory wallet store.
///
/// All entries apply under the write lock, so ledger mutations are
/// serialized per account: two concurrent debits can never both observe a
/// stale balance and overdraw it.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    accounts: Arc<RwLock<HashMap<String, AccountState>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn balance(&self, account_id: &str) -> Result<Balance> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(account_id)
            .map(|a| a.balance)
            .unwrap_or(Balance::ZERO))
    }

    async fn entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(account_id)
            .map(|a| a.entries.clone())
            .unwrap_or_default())
    }

    async fn find_entry(
        &self,
        account_id: &str,
        transaction_id: &str,
    ) -> Result<Option<LedgerEntry>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(account_id).and_then(|a| {
            a.entries
                .iter()
                .find(|e| e.transaction_id == transaction_id)
                .cloned()
        }))
    }

    async fn apply(&self, entry: LedgerEntry) -> Result<Applied> {
        let mut accounts = self.accounts.write().await;

        // Idempotent replay: the (account, transaction id) pair is applied
        // at most once.
        if let Some(account) = accounts.get(&entry.account_id)
            && account
                .entries
                .iter()
                .any(|e| e.transaction_id == entry.transaction_id)
        {
            return Ok(Applied {
                balance: account.balance,
                replayed: true,
            });
        }

        let current = accounts
            .get(&entry.account_id)
            .map(|a| a.balance)
            .unwrap_or(Balance::ZERO);
        let next = current + Balance::new(entry.amount);
        if next < Balance::ZERO {
            // Rejected without touching the map: a failed debit leaves no
            // trace, not even an empty account.
            return Err(SettlementError::InsufficientFunds {
                account: entry.account_id.clone(),
                requested: -entry.amount,
                available: current.value(),
            });
        }

        let account = accounts.entry(entry.account_id.clone()).or_default();
        account.balance = next;
        account.entries.push(entry);
        Ok(Applied {
            balance: account.balance,
            replayed: false,
        })
    }

    async fn accounts(&self) -> Result<Vec<WalletAccount>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .map(|(owner_id, state)| WalletAccount {
                owner_id: owner_id.clone(),
                balance: state.balance,
            })
            .collect())
    }
}

/// A thread-safe in-memory store for membership plans and orders.
#[derive(Default, Clone)]
pub struct InMemoryMembershipStore {
    plans: Arc<RwLock<HashMap<Uuid, MembershipPlan>>>,
    orders: Arc<RwLock<HashMap<String, MembershipOrder>>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn insert_plan(&self, plan: MembershipPlan) -> Result<()> {
        let mut plans = self.plans.write().await;
        let name = plan.name.to_lowercase();
        if plans.values().any(|p| p.name.to_lowercase() == name) {
            return Err(SettlementError::Conflict(format!(
                "a plan named '{}' already exists",
                plan.name
            )));
        }
        plans.insert(plan.id, plan);
        Ok(())
    }

    async fn update_plan(&self, plan: MembershipPlan) -> Result<()> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.id) {
            Some(stored) => {
                *stored = plan;
                Ok(())
            }
            None => Err(SettlementError::NotFound(format!("plan {}", plan.id))),
        }
    }

    async fn plan(&self, plan_id: Uuid) -> Result<Option<MembershipPlan>> {
        let plans = self.plans.read().await;
        Ok(plans.get(&plan_id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<MembershipPlan>> {
        let plans = self.plans.read().await;
        let mut all: Vec<MembershipPlan> = plans.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert_order(&self, order: MembershipOrder) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_ref) {
            return Err(SettlementError::Conflict(format!(
                "order {} already exists",
                order.order_ref
            )));
        }
        orders.insert(order.order_ref.clone(), order);
        Ok(())
    }

    async fn order_by_ref(&self, order_ref: &str) -> Result<Option<MembershipOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_ref).cloned())
    }

    async fn list_orders(&self, instructor_id: &str) -> Result<Vec<MembershipOrder>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| o.instructor_id == instructor_id)
            .cloned()
            .collect())
    }

    async fn settle_order_if_pending(
        &self,
        order_ref: &str,
        status: OrderPaymentStatus,
        transaction_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Option<MembershipOrder>> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(order_ref) {
            Some(order) if order.payment_status == OrderPaymentStatus::Pending => {
                order.payment_status = status;
                order.transaction_id = Some(transaction_id.to_string());
                order.start_date = Some(start_date);
                order.end_date = Some(end_date);
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// In-memory instructor membership directory.
#[derive(Default, Clone)]
pub struct InMemoryInstructorDirectory {
    memberships: Arc<RwLock<HashMap<String, Membership>>>,
}

impl InMemoryInstructorDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstructorDirectory for InMemoryInstructorDirectory {
    async fn membership(&self, instructor_id: &str) -> Result<Option<Membership>> {
        let memberships = self.memberships.read().await;
        Ok(memberships.get(instructor_id).cloned())
    }

    async fn set_membership(&self, instructor_id: &str, membership: Membership) -> Result<()> {
        let mut memberships = self.memberships.write().await;
        memberships.insert(instructor_id.to_string(), membership);
        Ok(())
    }
}
