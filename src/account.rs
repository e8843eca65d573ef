//! Account model.
//!
//! Balance changes and history appends are only made together, through
//! [`Account::commit`], so an account never shows one without the other.

use crate::address::{Address, Timestamp};
use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::transaction::{Transaction, TransactionKind};

/// State of one address.
///
/// # Invariants
///
/// - `balance` never goes below zero and never wraps
/// - `history` is append-only; entries are never reordered or removed
///   except when an in-flight withdrawal is rolled back before its lock
///   is released
/// - every committed balance change has exactly one matching history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    address: Address,
    created_at: Timestamp,
    updated_at: Timestamp,
    balance: Amount,
    history: Vec<Transaction>,
}

/// State captured before a mutation that may still have to be undone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    balance: Amount,
    updated_at: Timestamp,
    history_len: usize,
}

impl Account {
    /// Creates an empty account. `updated_at` stays 0 until the first mutation.
    pub(crate) fn new(address: Address, created_at: Timestamp) -> Self {
        Account {
            address,
            created_at,
            updated_at: 0,
            balance: Amount::ZERO,
            history: Vec::new(),
        }
    }

    /// Rebuilds an account from persisted parts. Callers validate consistency.
    pub(crate) fn from_parts(
        address: Address,
        created_at: Timestamp,
        updated_at: Timestamp,
        balance: Amount,
        history: Vec<Transaction>,
    ) -> Self {
        Account {
            address,
            created_at,
            updated_at,
            balance,
            history,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn transactions_count(&self) -> usize {
        self.history.len()
    }

    pub fn transaction(&self, index: usize) -> Result<&Transaction> {
        self.history
            .get(index)
            .ok_or_else(|| LedgerError::IndexOutOfBounds {
                address: self.address.clone(),
                index,
                len: self.history.len(),
            })
    }

    /// Linear scan of the history, preserving order.
    pub fn search_by_kind(&self, kind: TransactionKind) -> Vec<Transaction> {
        self.history
            .iter()
            .filter(|tx| tx.kind() == kind)
            .cloned()
            .collect()
    }

    /// Balance after crediting `amount`, without applying it.
    pub(crate) fn credited(&self, amount: Amount) -> Result<Amount> {
        self.balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::AmountOverflow {
                address: self.address.clone(),
                balance: self.balance,
                amount,
            })
    }

    /// Balance after debiting `amount`, without applying it.
    pub(crate) fn debited(&self, amount: Amount) -> Result<Amount> {
        self.balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                address: self.address.clone(),
                balance: self.balance,
                requested: amount,
            })
    }

    /// Sets the new balance and appends the entry that explains it.
    pub(crate) fn commit(&mut self, balance: Amount, entry: Transaction) {
        self.updated_at = entry.timestamp();
        self.balance = balance;
        self.history.push(entry);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            balance: self.balance,
            updated_at: self.updated_at,
            history_len: self.history.len(),
        }
    }

    /// Undoes every commit made since `checkpoint`.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.balance = checkpoint.balance;
        self.updated_at = checkpoint.updated_at;
        self.history.truncate(checkpoint.history_len);
    }
}
