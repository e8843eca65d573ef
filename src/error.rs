//! Error types for the ledger.

use crate::address::Address;
use crate::amount::Amount;
use crate::custody::CustodyError;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur during ledger operation.
///
/// None of these are retried by the ledger. A failed operation leaves no
/// balance or history change behind, except [`LedgerError::WithdrawalStranded`]
/// where the debit is kept.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The acting account does not exist
    #[error("Account {0} not found")]
    AccountNotFound(Address),

    /// The receiving side of a transfer does not exist
    #[error("Counterparty account {0} not found")]
    CounterpartyNotFound(Address),

    /// An account already exists for this address
    #[error("Account {0} already exists")]
    DuplicateAccount(Address),

    /// A withdrawal or transfer asks for more than the balance holds
    #[error("Insufficient balance in {address}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        address: Address,
        balance: Amount,
        requested: Amount,
    },

    /// History lookup past the last entry
    #[error("Transaction index {index} out of bounds for {address} (history length {len})")]
    IndexOutOfBounds {
        address: Address,
        index: usize,
        len: usize,
    },

    /// Structurally invalid request, such as a transfer to self
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A credit would push the balance past `Amount::MAX`
    #[error("Crediting {amount} to {address} would overflow balance {balance}")]
    AmountOverflow {
        address: Address,
        balance: Amount,
        amount: Amount,
    },

    /// The asset custody service refused to move value
    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    /// A withdrawal was debited, but custody would neither release the value
    /// to the caller nor take it back into the reserve
    #[error("Withdrawal of {amount} from {address} is stranded in custody: {reason}")]
    WithdrawalStranded {
        address: Address,
        amount: Amount,
        reason: CustodyError,
    },

    /// Failed to open or read an input or snapshot file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Snapshot (de)serialisation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid operation record in a replay file
    #[error("Invalid operation at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// A restored snapshot is internally inconsistent
    #[error("Corrupt snapshot for account {address}: {reason}")]
    CorruptSnapshot { address: Address, reason: String },
}
