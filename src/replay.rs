//! Batch replay of operations from CSV, and CSV reports of ledger state.
//!
//! Records are read one at a time. Rows that cannot be parsed or whose
//! operation fails are logged at warn level and skipped; a failed
//! operation never leaves partial state, so replay simply continues.

use crate::address::Address;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::transaction::{Operation, OperationKind, OperationRecord};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::io::{Read, Write};

/// Outcome counts of one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Applies a single parsed operation.
pub fn apply(ledger: &Ledger, operation: &Operation) -> Result<()> {
    let now = operation.timestamp;
    let address = &operation.address;
    match &operation.kind {
        OperationKind::Create => ledger.create_account(address, now),
        OperationKind::Deposit(amount) => ledger.deposit(address, *amount, now),
        OperationKind::Withdraw(amount) => ledger.withdraw(address, *amount, now),
        OperationKind::Transfer { to, amount } => ledger.transfer(address, to, *amount, now),
    }
}

/// Replays operations from a CSV reader in order.
pub fn process_csv<R: Read>(ledger: &Ledger, reader: R) -> Result<ReplaySummary> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut summary = ReplaySummary::default();

    for (row_idx, result) in csv_reader.deserialize::<OperationRecord>().enumerate() {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row

        let outcome = match result {
            Ok(record) => match record.parse() {
                Ok(operation) => apply(ledger, &operation).map_err(|e| e.to_string()),
                Err(message) => Err(message),
            },
            Err(e) => Err(format!("CSV parse error: {}", e)),
        };

        match outcome {
            Ok(()) => {
                debug!("Row {}: applied", row_num);
                summary.applied += 1;
            }
            Err(message) => {
                warn!("Row {}: {}", row_num, message);
                summary.rejected += 1;
            }
        }
    }

    Ok(summary)
}

/// Writes one summary row per account, sorted by address.
pub fn write_output<W: Write>(ledger: &Ledger, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["address", "balance", "transactions", "created_at", "updated_at"])?;

    for account in ledger.snapshot().accounts.values() {
        csv_writer.write_record([
            account.address.to_string(),
            account.balance.to_string(),
            account.history.len().to_string(),
            account.created_at.to_string(),
            account.updated_at.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes one row per history entry of `address`, in insertion order.
pub fn write_history<W: Write>(ledger: &Ledger, address: &Address, writer: W) -> Result<()> {
    let history = ledger.transaction_history(address)?;
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["index", "kind", "amount", "from", "to", "timestamp"])?;

    for (index, entry) in history.iter().enumerate() {
        csv_writer.write_record([
            index.to_string(),
            entry.kind().to_string(),
            entry.amount().to_string(),
            entry.counterparty_from().map(Address::to_string).unwrap_or_default(),
            entry.counterparty_to().map(Address::to_string).unwrap_or_default(),
            entry.timestamp().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
