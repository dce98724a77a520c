use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use slotbook::application::booking::BookingOrchestrator;
use slotbook::application::ledger::WalletLedger;
use slotbook::application::membership::MembershipOrchestrator;
use slotbook::application::scheduler::SlotScheduler;
use slotbook::domain::membership::{MembershipOrder, MembershipPlan, OrderPaymentStatus};
use slotbook::domain::money::Balance;
use slotbook::domain::ports::{
    MembershipStore, MembershipStoreRef, PaymentGatewayRef, WalletStore, WalletStoreRef,
};
use slotbook::domain::wallet::{Applied, LedgerEntry, WalletAccount};
use slotbook::error::{Result, SettlementError};
use slotbook::infrastructure::gateway::HmacGateway;
use slotbook::infrastructure::in_memory::{
    InMemoryBookingStore, InMemoryInstructorDirectory, InMemoryMembershipStore, InMemorySlotStore,
    InMemoryWalletStore,
};
use slotbook::infrastructure::notify::RecordingSink;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";
pub const CURRENCY: &str = "USD";
pub const PLATFORM: &str = "platform";

/// Fully wired in-memory engine for integration tests.
pub struct TestEngine {
    pub scheduler: SlotScheduler,
    pub ledger: WalletLedger,
    pub bookings: BookingOrchestrator,
    pub memberships: MembershipOrchestrator,
    pub gateway: HmacGateway,
    pub sink: RecordingSink,
    pub directory: Arc<InMemoryInstructorDirectory>,
    pub membership_store: MembershipStoreRef,
    pub booking_store: Arc<InMemoryBookingStore>,
}

pub fn engine() -> TestEngine {
    engine_with_wallets(Arc::new(InMemoryWalletStore::new()))
}

pub fn engine_with_wallets(wallets: WalletStoreRef) -> TestEngine {
    build_engine(wallets, Arc::new(InMemoryMembershipStore::new()))
}

pub fn engine_with_memberships(memberships: MembershipStoreRef) -> TestEngine {
    build_engine(Arc::new(InMemoryWalletStore::new()), memberships)
}

fn build_engine(wallets: WalletStoreRef, membership_store: MembershipStoreRef) -> TestEngine {
    let slots = Arc::new(InMemorySlotStore::new());
    let booking_store = Arc::new(InMemoryBookingStore::new());
    let directory = Arc::new(InMemoryInstructorDirectory::new());
    let gateway = HmacGateway::new(SECRET);
    let gateway_ref: PaymentGatewayRef = Arc::new(gateway.clone());
    let sink = RecordingSink::new();

    let ledger = WalletLedger::new(wallets);
    let scheduler = SlotScheduler::new(slots.clone());
    let booking_orchestrator = BookingOrchestrator::new(
        slots,
        booking_store.clone(),
        ledger.clone(),
        gateway_ref.clone(),
        Arc::new(sink.clone()),
        CURRENCY,
    );
    let membership_orchestrator = MembershipOrchestrator::new(
        membership_store.clone(),
        directory.clone(),
        ledger.clone(),
        gateway_ref,
        Arc::new(sink.clone()),
        CURRENCY,
        PLATFORM,
    );

    TestEngine {
        scheduler,
        ledger,
        bookings: booking_orchestrator,
        memberships: membership_orchestrator,
        gateway,
        sink,
        directory,
        membership_store,
        booking_store,
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, day, hour, 0, 0).unwrap()
}

/// Wallet store that fails `apply` for designated accounts, for forcing
/// partial failure in the middle of a settlement.
#[derive(Clone)]
pub struct FailingWalletStore {
    inner: InMemoryWalletStore,
    fail_for: HashSet<String>,
}

impl FailingWalletStore {
    pub fn failing_for(accounts: &[&str]) -> Self {
        Self {
            inner: InMemoryWalletStore::new(),
            fail_for: accounts.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl WalletStore for FailingWalletStore {
    async fn balance(&self, account_id: &str) -> Result<Balance> {
        self.inner.balance(account_id).await
    }

    async fn entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        self.inner.entries(account_id).await
    }

    async fn find_entry(
        &self,
        account_id: &str,
        transaction_id: &str,
    ) -> Result<Option<LedgerEntry>> {
        self.inner.find_entry(account_id, transaction_id).await
    }

    async fn apply(&self, entry: LedgerEntry) -> Result<Applied> {
        if self.fail_for.contains(&entry.account_id) {
            return Err(SettlementError::Upstream(format!(
                "injected failure for account {}",
                entry.account_id
            )));
        }
        self.inner.apply(entry).await
    }

    async fn accounts(&self) -> Result<Vec<WalletAccount>> {
        self.inner.accounts().await
    }
}

/// Membership store that rejects order writes, for forcing settlement
/// failure after both money legs applied.
#[derive(Default, Clone)]
pub struct FailingMembershipStore {
    inner: InMemoryMembershipStore,
}

impl FailingMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for FailingMembershipStore {
    async fn insert_plan(&self, plan: MembershipPlan) -> Result<()> {
        self.inner.insert_plan(plan).await
    }

    async fn update_plan(&self, plan: MembershipPlan) -> Result<()> {
        self.inner.update_plan(plan).await
    }

    async fn plan(&self, plan_id: Uuid) -> Result<Option<MembershipPlan>> {
        self.inner.plan(plan_id).await
    }

    async fn list_plans(&self) -> Result<Vec<MembershipPlan>> {
        self.inner.list_plans().await
    }

    async fn insert_order(&self, order: MembershipOrder) -> Result<()> {
        Err(SettlementError::Upstream(format!(
            "injected failure for order {}",
            order.order_ref
        )))
    }

    async fn order_by_ref(&self, order_ref: &str) -> Result<Option<MembershipOrder>> {
        self.inner.order_by_ref(order_ref).await
    }

    async fn list_orders(&self, instructor_id: &str) -> Result<Vec<MembershipOrder>> {
        self.inner.list_orders(instructor_id).await
    }

    async fn settle_order_if_pending(
        &self,
        order_ref: &str,
        status: OrderPaymentStatus,
        transaction_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Option<MembershipOrder>> {
        self.inner
            .settle_order_if_pending(order_ref, status, transaction_id, start_date, end_date)
            .await
    }
}

/// Asserts the ledger conservation invariant for an account: the balance
/// equals the sum of its entries.
pub async fn assert_conserved(ledger: &WalletLedger, account_id: &str) {
    let balance = ledger.balance(account_id).await.unwrap();
    let sum: rust_decimal::Decimal = ledger
        .history(account_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();
    assert_eq!(balance.value(), sum, "ledger conservation for {account_id}");
}
