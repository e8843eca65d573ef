//! Account registry and the ledger operation surface.
//!
//! Every mutating operation takes exclusive locks on the accounts it
//! touches before validating, and holds them until the balance change and
//! history append are both committed. Transfers lock both sides in
//! ascending address order, so opposing transfers between the same pair
//! cannot deadlock.

use crate::account::Account;
use crate::address::{Address, Timestamp};
use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::transaction::{Transaction, TransactionKind};
use log::debug;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to one account's lock.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    address: Address,
    inner: Arc<Mutex<Account>>,
}

impl AccountHandle {
    fn new(account: Account) -> Self {
        AccountHandle {
            address: account.address().clone(),
            inner: Arc::new(Mutex::new(account)),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Blocks until this caller has exclusive access to the account.
    pub fn lock(&self) -> MutexGuard<'_, Account> {
        self.inner.lock()
    }
}

/// Locks two distinct accounts in ascending address order.
///
/// Guards are returned in argument order.
pub(crate) fn lock_pair<'a>(
    first: &'a AccountHandle,
    second: &'a AccountHandle,
) -> (MutexGuard<'a, Account>, MutexGuard<'a, Account>) {
    if first.address <= second.address {
        let a = first.lock();
        let b = second.lock();
        (a, b)
    } else {
        let b = second.lock();
        let a = first.lock();
        (a, b)
    }
}

/// Creates an empty ledger.
pub fn create_tracker() -> Ledger {
    Ledger::new()
}

/// The root registry owning every account, keyed by address.
///
/// `Ledger` is `Sync`; share it between threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: RwLock<HashMap<Address, AccountHandle>>,
}

impl Ledger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Ledger {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.address().clone(), AccountHandle::new(account)))
            .collect();
        Ledger {
            accounts: RwLock::new(accounts),
        }
    }

    // ==================== REGISTRY ====================

    /// Inserts a new empty account for `address`.
    pub fn create(&self, address: &Address, now: Timestamp) -> Result<AccountHandle> {
        let mut accounts = self.accounts.write();
        match accounts.entry(address.clone()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateAccount(address.clone())),
            Entry::Vacant(slot) => {
                let handle = AccountHandle::new(Account::new(address.clone(), now));
                slot.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Returns an owned copy of the account's current state.
    pub fn get(&self, address: &Address) -> Result<Account> {
        self.read(address, Account::clone)
    }

    /// Returns the handle through which the account can be locked for mutation.
    pub fn get_mut(&self, address: &Address) -> Result<AccountHandle> {
        self.accounts
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(address.clone()))
    }

    /// Number of accounts.
    pub fn size(&self) -> usize {
        self.accounts.read().len()
    }

    /// All addresses in ascending order.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<_> = self.accounts.read().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    /// Handles for every account, in the global lock order.
    pub(crate) fn handles_in_order(&self) -> Vec<AccountHandle> {
        let mut handles: Vec<_> = self.accounts.read().values().cloned().collect();
        handles.sort_by(|a, b| a.address.cmp(&b.address));
        handles
    }

    /// Resolves both sides of a transfer under a single map read.
    fn resolve_pair(&self, from: &Address, to: &Address) -> Result<(AccountHandle, AccountHandle)> {
        let accounts = self.accounts.read();
        let sender = accounts
            .get(from)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(from.clone()))?;
        let recipient = accounts
            .get(to)
            .cloned()
            .ok_or_else(|| LedgerError::CounterpartyNotFound(to.clone()))?;
        Ok((sender, recipient))
    }

    fn read<T>(&self, address: &Address, f: impl FnOnce(&Account) -> T) -> Result<T> {
        let handle = self.get_mut(address)?;
        let account = handle.lock();
        Ok(f(&account))
    }

    // ==================== MUTATIONS ====================

    /// Creates the account for `address`. Fails if one already exists.
    pub fn create_account(&self, address: &Address, now: Timestamp) -> Result<()> {
        self.create(address, now)?;
        debug!("Created account {} at {}", address, now);
        Ok(())
    }

    /// Credits `amount` to `address` and records a deposit.
    pub fn deposit(&self, address: &Address, amount: Amount, now: Timestamp) -> Result<()> {
        let handle = self.get_mut(address)?;
        let mut account = handle.lock();

        let balance = account.credited(amount)?;
        account.commit(balance, Transaction::Deposit { amount, timestamp: now });

        debug!("Deposited {} to {}, balance {}", amount, address, balance);
        Ok(())
    }

    /// Debits `amount` from `address` and records a withdrawal.
    pub fn withdraw(&self, address: &Address, amount: Amount, now: Timestamp) -> Result<()> {
        let handle = self.get_mut(address)?;
        let mut account = handle.lock();

        let balance = account.debited(amount)?;
        account.commit(balance, Transaction::Withdraw { amount, timestamp: now });

        debug!("Withdrew {} from {}, balance {}", amount, address, balance);
        Ok(())
    }

    /// Moves `amount` from `from` to `to`, recording an identical transfer
    /// entry on both histories.
    ///
    /// Both accounts stay locked until both sides are committed; if either
    /// side would fail, neither is touched.
    pub fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        self.transfer_with(from, to, amount, |_| now)
    }

    /// Transfer whose timestamp is chosen once both accounts are locked.
    ///
    /// `now` receives the later `updated_at` of the two accounts.
    pub(crate) fn transfer_with(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: impl FnOnce(Timestamp) -> Timestamp,
    ) -> Result<()> {
        if from == to {
            return Err(LedgerError::InvalidOperation(format!(
                "cannot transfer from {} to itself",
                from
            )));
        }

        let (sender_handle, recipient_handle) = self.resolve_pair(from, to)?;
        let (mut sender, mut recipient) = lock_pair(&sender_handle, &recipient_handle);

        let sender_balance = sender.debited(amount)?;
        let recipient_balance = recipient.credited(amount)?;

        let timestamp = now(sender.updated_at().max(recipient.updated_at()));
        let entry = Transaction::Transfer {
            amount,
            from: from.clone(),
            to: to.clone(),
            timestamp,
        };
        sender.commit(sender_balance, entry.clone());
        recipient.commit(recipient_balance, entry);

        debug!("Transferred {} from {} to {}", amount, from, to);
        Ok(())
    }

    // ==================== QUERIES ====================

    pub fn account_balance(&self, address: &Address) -> Result<Amount> {
        self.read(address, Account::balance)
    }

    pub fn account_created_at(&self, address: &Address) -> Result<Timestamp> {
        self.read(address, Account::created_at)
    }

    pub fn account_updated_at(&self, address: &Address) -> Result<Timestamp> {
        self.read(address, Account::updated_at)
    }

    pub fn accounts_count(&self) -> usize {
        self.size()
    }

    pub fn get_transaction(&self, address: &Address, index: usize) -> Result<Transaction> {
        self.read(address, |account| account.transaction(index).cloned())?
    }

    /// Copy of the account's history in insertion order.
    ///
    /// The returned vector is detached from the ledger; later appends do
    /// not show up in it, and it is always a prefix of any later copy.
    pub fn transaction_history(&self, address: &Address) -> Result<Vec<Transaction>> {
        self.read(address, |account| account.history().to_vec())
    }

    pub fn transactions_count(&self, address: &Address) -> Result<usize> {
        self.read(address, Account::transactions_count)
    }

    /// All entries of `kind`, in history order. Empty if none match.
    pub fn search_by_kind(
        &self,
        address: &Address,
        kind: TransactionKind,
    ) -> Result<Vec<Transaction>> {
        self.read(address, |account| account.search_by_kind(kind))
    }

    /// Sum of all balances, read with every account locked at once.
    pub fn total_balance(&self) -> u128 {
        let handles = self.handles_in_order();
        let guards: Vec<_> = handles.iter().map(AccountHandle::lock).collect();
        guards
            .iter()
            .map(|account| u128::from(account.balance().value()))
            .sum()
    }
}
