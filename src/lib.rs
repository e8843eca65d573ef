//! # Account Ledger
//!
//! Per-address balances with an append-only transaction history, and
//! deposit, withdrawal and transfer operations that keep both consistent
//! under concurrent access.
//!
//! ## Design Principles
//!
//! - **No partial effects**: every mutation checks all preconditions under
//!   the account locks before changing anything
//! - **Conservation**: transfers move value between accounts exactly;
//!   balances never go negative and never wrap
//! - **Per-account locking**: operations on different accounts run in
//!   parallel; transfers lock both sides in address order
//! - **Structural history**: counterparties exist only on transfer entries
//!
//! ## Example
//!
//! ```
//! use account_ledger::{create_tracker, Address, Amount};
//!
//! let ledger = create_tracker();
//! let alice = Address::from("alice");
//! let bob = Address::from("bob");
//!
//! ledger.create_account(&alice, 1).unwrap();
//! ledger.create_account(&bob, 1).unwrap();
//! ledger.deposit(&alice, Amount::new(100), 2).unwrap();
//! ledger.transfer(&alice, &bob, Amount::new(40), 3).unwrap();
//!
//! assert_eq!(ledger.account_balance(&alice).unwrap(), Amount::new(60));
//! assert_eq!(ledger.account_balance(&bob).unwrap(), Amount::new(40));
//! ```

pub mod account;
pub mod address;
pub mod amount;
pub mod context;
pub mod custody;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod replay;
pub mod snapshot;
pub mod transaction;

pub use account::Account;
pub use address::{Address, Timestamp};
pub use amount::Amount;
pub use context::{Clock, IdentityProvider, ManualClock, SystemClock};
pub use custody::{AssetCustody, Coin, CustodyError, InMemoryCustody, Rejected};
pub use engine::LedgerEngine;
pub use error::{LedgerError, Result};
pub use ledger::{create_tracker, AccountHandle, Ledger};
pub use replay::ReplaySummary;
pub use snapshot::{AccountRecord, LedgerSnapshot};
pub use transaction::{Operation, OperationKind, OperationRecord, Transaction, TransactionKind};
