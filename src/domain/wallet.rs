use super::money::Balance;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A principal's internal wallet balance.
///
/// Mutated only through `LedgerEntry` application; the balance always equals
/// the sum of the account's entries and never goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub owner_id: String,
    pub balance: Balance,
}

impl WalletAccount {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            balance: Balance::ZERO,
        }
    }
}

/// One append-only balance mutation.
///
/// `amount` is signed: positive for credits, negative for debits. The
/// `(account_id, transaction_id)` pair is the idempotency key; applying the
/// same pair twice is a no-op returning the original outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_id: String,
    pub amount: Decimal,
    pub reason: String,
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        account_id: impl Into<String>,
        amount: Decimal,
        reason: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount,
            reason: reason.into(),
            transaction_id: transaction_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of applying a ledger entry.
///
/// `replayed` is true when the entry's transaction id had already been
/// applied to the account and the stored outcome was returned instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Applied {
    pub balance: Balance,
    pub replayed: bool,
}

/// Synthesizes the wallet-rail transaction id for a slot purchase.
pub fn wallet_slot_txn() -> String {
    format!("wallet-slot-{}", Uuid::new_v4())
}

/// Synthesizes the wallet-rail transaction id for a membership purchase.
pub fn wallet_membership_txn() -> String {
    format!("wallet-membership-{}", Uuid::new_v4())
}

/// Derives the compensation id for reversing a previously applied movement.
///
/// Reversals are new entries under this id, never mutations of the original,
/// so the ledger stays append-only and auditable.
pub fn refund_txn(original: &str) -> String {
    format!("refund_{original}")
}
