use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SettlementError>;

/// Error taxonomy of the settlement engine.
///
/// `Validation`, `NotFound`, `Conflict`, `InsufficientFunds` and
/// `Unauthorized` are synchronous rejections with no state change.
/// `SettlementHazard` is the one exception: money already moved but the
/// resource could not be secured, so a compensating wallet credit has been
/// recorded before the error is surfaced.
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(
        "insufficient funds in account {account}: requested {requested}, available {available}"
    )]
    InsufficientFunds {
        account: String,
        requested: Decimal,
        available: Decimal,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("settlement hazard: {detail} (compensated via {refund_txn})")]
    SettlementHazard { detail: String, refund_txn: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
