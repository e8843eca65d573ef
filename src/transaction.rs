//! Transaction records and replay operation parsing.

use crate::address::{Address, Timestamp};
use crate::amount::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a ledger event, used for filtering history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" | "withdrawal" => Ok(TransactionKind::Withdraw),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(format!("unknown transaction kind '{}'", other)),
        }
    }
}

/// One immutable ledger event.
///
/// Counterparties exist only on transfers, so a deposit or withdrawal can
/// never carry a sender or recipient. Both sides of a transfer record an
/// identical entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction {
    /// Value entered the account from custody.
    Deposit { amount: Amount, timestamp: Timestamp },

    /// Value left the account back to custody.
    Withdraw { amount: Amount, timestamp: Timestamp },

    /// Value moved between two accounts inside the ledger.
    Transfer {
        amount: Amount,
        from: Address,
        to: Address,
        timestamp: Timestamp,
    },
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Transaction::Deposit { .. } => TransactionKind::Deposit,
            Transaction::Withdraw { .. } => TransactionKind::Withdraw,
            Transaction::Transfer { .. } => TransactionKind::Transfer,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Transaction::Deposit { amount, .. }
            | Transaction::Withdraw { amount, .. }
            | Transaction::Transfer { amount, .. } => *amount,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Transaction::Deposit { timestamp, .. }
            | Transaction::Withdraw { timestamp, .. }
            | Transaction::Transfer { timestamp, .. } => *timestamp,
        }
    }

    /// Sender of a transfer; `None` for deposits and withdrawals.
    pub fn counterparty_from(&self) -> Option<&Address> {
        match self {
            Transaction::Transfer { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Recipient of a transfer; `None` for deposits and withdrawals.
    pub fn counterparty_to(&self) -> Option<&Address> {
        match self {
            Transaction::Transfer { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// Raw operation record as read from a replay CSV.
///
/// Columns: `op,address,counterparty,amount,timestamp`.
#[derive(Debug, Deserialize)]
pub struct OperationRecord {
    /// Operation: create, deposit, withdraw, transfer
    pub op: String,

    /// Acting account
    pub address: String,

    /// Recipient (transfer only)
    pub counterparty: Option<String>,

    /// Amount (absent for create)
    pub amount: Option<String>,

    /// Clock reading for this operation, in milliseconds
    pub timestamp: Timestamp,
}

impl OperationRecord {
    /// Parses the raw CSV record into a typed operation.
    ///
    /// Returns a description of the problem if the record is unusable.
    pub fn parse(&self) -> std::result::Result<Operation, String> {
        let address = non_empty(Some(&self.address)).ok_or("missing address")?;
        let address = Address::new(address);

        let kind = match self.op.trim().to_lowercase().as_str() {
            "create" => OperationKind::Create,
            "deposit" => OperationKind::Deposit(self.parse_amount()?),
            "withdraw" | "withdrawal" => OperationKind::Withdraw(self.parse_amount()?),
            "transfer" => {
                let to = non_empty(self.counterparty.as_ref())
                    .ok_or("transfer requires a counterparty")?;
                OperationKind::Transfer {
                    to: Address::new(to),
                    amount: self.parse_amount()?,
                }
            }
            other => return Err(format!("unknown operation '{}'", other)),
        };

        Ok(Operation {
            address,
            timestamp: self.timestamp,
            kind,
        })
    }

    fn parse_amount(&self) -> std::result::Result<Amount, String> {
        let raw = non_empty(self.amount.as_ref()).ok_or("missing amount")?;
        Amount::from_str(raw).map_err(|e| format!("invalid amount '{}': {}", raw, e))
    }
}

fn non_empty(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// A parsed operation ready to apply to a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Acting account
    pub address: Address,

    /// Clock reading shared by every effect of the operation
    pub timestamp: Timestamp,

    pub kind: OperationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Deposit(Amount),
    Withdraw(Amount),
    Transfer { to: Address, amount: Amount },
}
