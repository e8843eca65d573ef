//! Custody-backed ledger engine.
//!
//! Wraps a [`Ledger`] with the collaborators a live deployment needs: a
//! clock read once per mutating call, an identity provider resolving the
//! caller, and an asset custody service holding the value behind every
//! balance in a single ledger-wide reserve.
//!
//! Lock order is account locks first, then the reserve. The clock is read
//! only once the account locks are held, and never below the accounts'
//! current `updated_at`, so timestamps follow the order in which
//! mutations commit.

use crate::account::Account;
use crate::address::{Address, Timestamp};
use crate::amount::Amount;
use crate::context::{Clock, IdentityProvider};
use crate::custody::AssetCustody;
use crate::error::{LedgerError, Result};
use crate::ledger::{create_tracker, AccountHandle, Ledger};
use crate::snapshot::LedgerSnapshot;
use crate::transaction::{Transaction, TransactionKind};
use log::{debug, error};
use parking_lot::Mutex;

/// Ledger operations for callers whose deposits and withdrawals move real
/// value through custody.
///
/// The underlying [`Ledger`] is not exposed, so every balance change goes
/// through custody:
///
/// ```compile_fail
/// use account_ledger::{Address, Amount, InMemoryCustody, LedgerEngine, ManualClock};
///
/// let engine = LedgerEngine::new(ManualClock::new(0), InMemoryCustody::new());
/// engine.ledger().deposit(&Address::from("alice"), Amount::new(1), 1);
/// ```
///
/// # Invariants
///
/// Whenever no operation is in flight, the sum of all account balances
/// equals the value of the reserve. Transfers move value between accounts
/// without touching the reserve.
pub struct LedgerEngine<C, K: AssetCustody> {
    ledger: Ledger,
    clock: C,
    custody: K,
    reserve: Mutex<K::Handle>,
}

impl<C: Clock, K: AssetCustody> LedgerEngine<C, K> {
    /// Creates an engine over an empty ledger and an empty reserve.
    pub fn new(clock: C, custody: K) -> Self {
        let reserve = custody.mint_zero();
        LedgerEngine {
            ledger: create_tracker(),
            clock,
            custody,
            reserve: Mutex::new(reserve),
        }
    }

    pub fn custody(&self) -> &K {
        &self.custody
    }

    pub fn reserve_value(&self) -> Amount {
        self.custody.value_of(&self.reserve.lock())
    }

    /// Checks balances against the reserve with every account locked.
    pub fn is_fully_backed(&self) -> bool {
        let handles = self.ledger.handles_in_order();
        let guards: Vec<_> = handles.iter().map(AccountHandle::lock).collect();
        let total: u128 = guards
            .iter()
            .map(|account| u128::from(account.balance().value()))
            .sum();

        let reserve = self.reserve.lock();
        total == u128::from(self.custody.value_of(&reserve).value())
    }

    /// A clock reading no earlier than the last mutation of `account`.
    fn now_for(&self, account: &Account) -> Timestamp {
        self.clock.now().max(account.updated_at())
    }

    // ==================== MUTATIONS ====================

    /// Opens the caller's account.
    pub fn create_account<I>(&self, identity: &I) -> Result<Address>
    where
        I: IdentityProvider + ?Sized,
    {
        let caller = identity.current_caller();
        self.ledger.create_account(&caller, self.clock.now())?;
        Ok(caller)
    }

    /// Pays `payment` into the caller's account.
    ///
    /// If the deposit cannot be applied the payment is released back to
    /// the caller before the error is returned.
    pub fn deposit<I>(&self, identity: &I, payment: K::Handle) -> Result<Amount>
    where
        I: IdentityProvider + ?Sized,
    {
        let caller = identity.current_caller();

        match self.try_deposit(&caller, payment) {
            Ok(amount) => {
                debug!("Deposited {} to {} from custody", amount, caller);
                Ok(amount)
            }
            Err((err, payment)) => {
                self.refund(&caller, payment);
                Err(err)
            }
        }
    }

    fn try_deposit(
        &self,
        caller: &Address,
        payment: K::Handle,
    ) -> std::result::Result<Amount, (LedgerError, K::Handle)> {
        let amount = self.custody.value_of(&payment);
        let handle = match self.ledger.get_mut(caller) {
            Ok(handle) => handle,
            Err(err) => return Err((err, payment)),
        };

        let mut account = handle.lock();
        let now = self.now_for(&account);
        let balance = match account.credited(amount) {
            Ok(balance) => balance,
            Err(err) => return Err((err, payment)),
        };

        let mut reserve = self.reserve.lock();
        if let Err(rejected) = self.custody.join(&mut reserve, payment) {
            return Err((rejected.error.into(), rejected.handle));
        }
        drop(reserve);

        account.commit(balance, Transaction::Deposit { amount, timestamp: now });
        Ok(amount)
    }

    fn refund(&self, caller: &Address, payment: K::Handle) {
        let amount = self.custody.value_of(&payment);
        if let Err(rejected) = self.custody.release_to(caller, payment) {
            error!(
                "Failed to refund {} to {}: {}",
                amount, caller, rejected.error
            );
        }
    }

    /// Withdraws `amount` from the caller's account and releases it to them.
    ///
    /// The ledger debit is rolled back if custody cannot release the value
    /// and takes it back into the reserve. If custody refuses both, the
    /// debit stands so the reserve still backs every balance, and
    /// [`LedgerError::WithdrawalStranded`] is returned.
    pub fn withdraw<I>(&self, identity: &I, amount: Amount) -> Result<()>
    where
        I: IdentityProvider + ?Sized,
    {
        let caller = identity.current_caller();

        let handle = self.ledger.get_mut(&caller)?;
        let mut account = handle.lock();
        let now = self.now_for(&account);

        let balance = account.debited(amount)?;
        let checkpoint = account.checkpoint();
        account.commit(balance, Transaction::Withdraw { amount, timestamp: now });

        let extracted = match self.custody.split(&mut self.reserve.lock(), amount) {
            Ok(extracted) => extracted,
            Err(err) => {
                account.restore(checkpoint);
                return Err(err.into());
            }
        };

        if let Err(rejected) = self.custody.release_to(&caller, extracted) {
            let mut reserve = self.reserve.lock();
            if let Err(lost) = self.custody.join(&mut reserve, rejected.handle) {
                error!(
                    "Stranded {} withdrawn by {}: release refused ({}), rejoin refused ({})",
                    self.custody.value_of(&lost.handle),
                    caller,
                    rejected.error,
                    lost.error
                );
                return Err(LedgerError::WithdrawalStranded {
                    address: caller,
                    amount,
                    reason: rejected.error,
                });
            }
            account.restore(checkpoint);
            return Err(rejected.error.into());
        }

        debug!("Withdrew {} from {} to custody", amount, caller);
        Ok(())
    }

    /// Moves `amount` from the caller to `to` inside the ledger.
    pub fn transfer<I>(&self, identity: &I, to: &Address, amount: Amount) -> Result<()>
    where
        I: IdentityProvider + ?Sized,
    {
        let caller = identity.current_caller();
        self.ledger
            .transfer_with(&caller, to, amount, |floor| self.clock.now().max(floor))
    }

    // ==================== QUERIES ====================

    pub fn account_balance(&self, address: &Address) -> Result<Amount> {
        self.ledger.account_balance(address)
    }

    pub fn account_created_at(&self, address: &Address) -> Result<Timestamp> {
        self.ledger.account_created_at(address)
    }

    pub fn account_updated_at(&self, address: &Address) -> Result<Timestamp> {
        self.ledger.account_updated_at(address)
    }

    pub fn accounts_count(&self) -> usize {
        self.ledger.accounts_count()
    }

    pub fn get_transaction(&self, address: &Address, index: usize) -> Result<Transaction> {
        self.ledger.get_transaction(address, index)
    }

    pub fn transaction_history(&self, address: &Address) -> Result<Vec<Transaction>> {
        self.ledger.transaction_history(address)
    }

    pub fn transactions_count(&self, address: &Address) -> Result<usize> {
        self.ledger.transactions_count(address)
    }

    pub fn search_by_kind(
        &self,
        address: &Address,
        kind: TransactionKind,
    ) -> Result<Vec<Transaction>> {
        self.ledger.search_by_kind(address, kind)
    }

    /// Consistent copy of every account, for persistence.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }
}
