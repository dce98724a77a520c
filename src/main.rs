use clap::Parser;
use miette::{IntoDiagnostic, Result};
use slotbook::application::booking::BookingOrchestrator;
use slotbook::application::ledger::WalletLedger;
use slotbook::application::scheduler::SlotScheduler;
use slotbook::domain::money::Amount;
use slotbook::domain::ports::{
    BookingStoreRef, NotificationSinkRef, PaymentGatewayRef, SlotStoreRef, WalletStoreRef,
};
use slotbook::error::SettlementError;
use slotbook::infrastructure::gateway::HmacGateway;
use slotbook::infrastructure::in_memory::{
    InMemoryBookingStore, InMemorySlotStore, InMemoryWalletStore,
};
use slotbook::infrastructure::notify::NullSink;
use slotbook::interfaces::csv::command_reader::{Command, CommandOp, CommandReader};
use slotbook::interfaces::csv::report_writer::BalanceWriter;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command script CSV file
    input: PathBuf,

    /// Settlement currency passed to the gateway
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Shared secret for gateway signature verification
    #[arg(long, default_value = "dev-secret")]
    gateway_secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let slots: SlotStoreRef = Arc::new(InMemorySlotStore::new());
    let bookings: BookingStoreRef = Arc::new(InMemoryBookingStore::new());
    let wallets: WalletStoreRef = Arc::new(InMemoryWalletStore::new());
    let gateway: PaymentGatewayRef = Arc::new(HmacGateway::new(&cli.gateway_secret));
    let sink: NotificationSinkRef = Arc::new(NullSink::new());

    let ledger = WalletLedger::new(wallets);
    let scheduler = SlotScheduler::new(slots.clone());
    let orchestrator = BookingOrchestrator::new(
        slots,
        bookings,
        ledger.clone(),
        gateway,
        sink,
        cli.currency.clone(),
    );

    // Slot labels in the script are resolved to the ids minted on creation.
    let mut slot_labels: HashMap<String, Uuid> = HashMap::new();

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) =
                    run_command(&command, &ledger, &scheduler, &orchestrator, &mut slot_labels)
                        .await
                {
                    eprintln!("Error processing command: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {e}");
            }
        }
    }

    let accounts = ledger.accounts().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(accounts).into_diagnostic()?;

    Ok(())
}

async fn run_command(
    command: &Command,
    ledger: &WalletLedger,
    scheduler: &SlotScheduler,
    orchestrator: &BookingOrchestrator,
    slot_labels: &mut HashMap<String, Uuid>,
) -> slotbook::error::Result<()> {
    match command.op {
        CommandOp::Topup => {
            let amount = required(command.amount, "amount")?;
            let txn = format!("topup_{}", Uuid::new_v4());
            ledger
                .credit(
                    &command.actor,
                    Amount::new(amount)?,
                    "wallet top-up",
                    &txn,
                )
                .await?;
        }
        CommandOp::CreateSlot => {
            let label = command
                .slot
                .clone()
                .ok_or_else(|| SettlementError::Validation("missing slot label".to_string()))?;
            let price = required(command.amount, "amount")?;
            let start = required(command.start, "start")?;
            let end = required(command.end, "end")?;
            let slot = scheduler
                .create_slot(&command.actor, start, end, price)
                .await?;
            slot_labels.insert(label, slot.id);
        }
        CommandOp::BookWallet => {
            let label = command
                .slot
                .as_deref()
                .ok_or_else(|| SettlementError::Validation("missing slot label".to_string()))?;
            let slot_id = slot_labels.get(label).copied().ok_or_else(|| {
                SettlementError::NotFound(format!("slot label '{label}'"))
            })?;
            orchestrator.book_via_wallet(slot_id, &command.actor).await?;
        }
    }
    Ok(())
}

fn required<T>(value: Option<T>, field: &str) -> slotbook::error::Result<T> {
    value.ok_or_else(|| SettlementError::Validation(format!("missing {field}")))
}
