use crate::domain::money::{Amount, Balance};
use crate::domain::ports::WalletStoreRef;
use crate::domain::wallet::{LedgerEntry, WalletAccount, refund_txn};
use crate::error::Result;

/// Append-only balance mutations with idempotent replay detection.
///
/// Each movement is a `LedgerEntry` applied atomically per account by the
/// store. Reversal never touches a prior entry; it appends a new credit
/// under a `refund_<txn>` id, keeping the ledger auditable.
#[derive(Clone)]
pub struct WalletLedger {
    wallets: WalletStoreRef,
}

impl WalletLedger {
    pub fn new(wallets: WalletStoreRef) -> Self {
        Self { wallets }
    }

    /// Increases the account balance. Replaying the same transaction id
    /// against the same account leaves the ledger untouched.
    pub async fn credit(
        &self,
        account_id: &str,
        amount: Amount,
        reason: &str,
        transaction_id: &str,
    ) -> Result<Balance> {
        let entry = LedgerEntry::new(account_id, amount.value(), reason, transaction_id);
        let applied = self.wallets.apply(entry).await?;
        if applied.replayed {
            tracing::debug!(account_id, transaction_id, "credit replayed, no-op");
        }
        Ok(applied.balance)
    }

    /// Decreases the account balance, failing with `InsufficientFunds` and
    /// no state change when the balance does not cover the amount.
    pub async fn debit(
        &self,
        account_id: &str,
        amount: Amount,
        reason: &str,
        transaction_id: &str,
    ) -> Result<Balance> {
        let entry = LedgerEntry::new(account_id, -amount.value(), reason, transaction_id);
        let applied = self.wallets.apply(entry).await?;
        if applied.replayed {
            tracing::debug!(account_id, transaction_id, "debit replayed, no-op");
        }
        Ok(applied.balance)
    }

    /// Compensates a previously applied movement by crediting the account
    /// under the derived `refund_<original>` id.
    pub async fn refund(
        &self,
        account_id: &str,
        amount: Amount,
        original_transaction_id: &str,
        reason: &str,
    ) -> Result<Balance> {
        let txn = refund_txn(original_transaction_id);
        tracing::warn!(account_id, original_transaction_id, "issuing compensation");
        self.credit(account_id, amount, reason, &txn).await
    }

    pub async fn balance(&self, account_id: &str) -> Result<Balance> {
        self.wallets.balance(account_id).await
    }

    pub async fn history(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        self.wallets.entries(account_id).await
    }

    pub async fn entry(
        &self,
        account_id: &str,
        transaction_id: &str,
    ) -> Result<Option<LedgerEntry>> {
        self.wallets.find_entry(account_id, transaction_id).await
    }

    pub async fn accounts(&self) -> Result<Vec<WalletAccount>> {
        self.wallets.accounts().await
    }
}
