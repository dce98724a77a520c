use crate::domain::wallet::WalletAccount;
use crate::error::Result;
use std::io::Write;

/// Writes the final wallet balances as CSV.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes a header followed by one row per account, sorted by account
    /// id for stable output.
    pub fn write_balances(&mut self, mut accounts: Vec<WalletAccount>) -> Result<()> {
        accounts.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));

        self.writer.write_record(["account", "balance"])?;
        for account in accounts {
            self.writer
                .write_record([account.owner_id.as_str(), &account.balance.to_string()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
