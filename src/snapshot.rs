//! Persisted ledger layout and JSON save/restore.
//!
//! A snapshot is one keyed collection of account records, each carrying
//! its full ordered history. Restoring re-validates every record, then
//! checks that every transfer is recorded identically on both sides, so a
//! damaged file cannot produce a ledger that breaks its own invariants.

use crate::account::Account;
use crate::address::{Address, Timestamp};
use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::ledger::{AccountHandle, Ledger};
use crate::transaction::Transaction;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

/// Serialisable state of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub balance: Amount,
    pub history: Vec<Transaction>,
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        AccountRecord {
            address: account.address().clone(),
            created_at: account.created_at(),
            updated_at: account.updated_at(),
            balance: account.balance(),
            history: account.history().to_vec(),
        }
    }
}

impl AccountRecord {
    /// Replays the history from zero and checks it explains the balance.
    fn validate(&self, key: &Address) -> Result<()> {
        let corrupt = |reason: String| LedgerError::CorruptSnapshot {
            address: key.clone(),
            reason,
        };

        if &self.address != key {
            return Err(corrupt(format!("record is keyed by {}", self.address)));
        }

        let mut balance = Amount::ZERO;
        for (index, entry) in self.history.iter().enumerate() {
            let next = match entry {
                Transaction::Deposit { amount, .. } => balance.checked_add(*amount),
                Transaction::Withdraw { amount, .. } => balance.checked_sub(*amount),
                Transaction::Transfer {
                    amount, from, to, ..
                } => {
                    if from == to {
                        return Err(corrupt(format!("entry {} transfers to itself", index)));
                    }
                    if from == key {
                        balance.checked_sub(*amount)
                    } else if to == key {
                        balance.checked_add(*amount)
                    } else {
                        return Err(corrupt(format!(
                            "entry {} is a transfer between {} and {}",
                            index, from, to
                        )));
                    }
                }
            };
            balance = next.ok_or_else(|| {
                corrupt(format!("entry {} takes the balance out of range", index))
            })?;
        }

        if balance != self.balance {
            return Err(corrupt(format!(
                "history sums to {} but balance is {}",
                balance, self.balance
            )));
        }
        Ok(())
    }
}

/// Checks that each transfer entry appears exactly as often in the
/// recipient's history as in the sender's.
fn check_transfer_pairs(accounts: &BTreeMap<Address, AccountRecord>) -> Result<()> {
    let mut unmatched: HashMap<&Transaction, i64> = HashMap::new();

    for (key, record) in accounts {
        for (index, entry) in record.history.iter().enumerate() {
            let Transaction::Transfer { from, to, .. } = entry else {
                continue;
            };
            let other = if from == key { to } else { from };
            if !accounts.contains_key(other) {
                return Err(LedgerError::CorruptSnapshot {
                    address: key.clone(),
                    reason: format!("entry {} names unknown account {}", index, other),
                });
            }
            *unmatched.entry(entry).or_insert(0) += if from == key { 1 } else { -1 };
        }
    }

    match unmatched.into_iter().find(|(_, count)| *count != 0) {
        Some((Transaction::Transfer { from, to, .. }, count)) => {
            // Positive: the sender holds copies the recipient lacks.
            let (address, peer) = if count > 0 { (to, from) } else { (from, to) };
            Err(LedgerError::CorruptSnapshot {
                address: address.clone(),
                reason: format!("transfer recorded by {} is missing here", peer),
            })
        }
        _ => Ok(()),
    }
}

/// Durable shape of a whole ledger, ordered by address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: BTreeMap<Address, AccountRecord>,
}

impl LedgerSnapshot {
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Ledger {
    /// Copies every account while all of them are locked, so no
    /// half-applied transfer can appear in the result.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let handles = self.handles_in_order();
        let guards: Vec<_> = handles.iter().map(AccountHandle::lock).collect();
        let accounts = guards
            .iter()
            .map(|account| (account.address().clone(), AccountRecord::from(&**account)))
            .collect();
        LedgerSnapshot { accounts }
    }

    /// Rebuilds a ledger from a snapshot after validating every record.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Ledger> {
        for (key, record) in &snapshot.accounts {
            record.validate(key)?;
        }
        check_transfer_pairs(&snapshot.accounts)?;

        debug!("Restoring {} accounts from snapshot", snapshot.accounts.len());
        let accounts = snapshot.accounts.into_values().map(|record| {
            Account::from_parts(
                record.address,
                record.created_at,
                record.updated_at,
                record.balance,
                record.history,
            )
        });
        Ok(Ledger::from_accounts(accounts))
    }
}
