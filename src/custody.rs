//! Asset custody: the external system holding the value behind balances.

use crate::address::Address;
use crate::amount::Amount;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors reported by a custody service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("cannot split {requested} from a handle holding {available}")]
    InsufficientValue { available: Amount, requested: Amount },

    #[error("joining {amount} into a handle holding {held} would overflow")]
    Overflow { held: Amount, amount: Amount },

    #[error("release to {0} was refused")]
    ReleaseRefused(Address),

    #[error("join was refused")]
    JoinRefused,
}

/// A custody call that failed after taking ownership of a value handle.
///
/// The handle is handed back so the caller can return the value to where
/// it came from.
#[derive(Debug)]
pub struct Rejected<H> {
    pub error: CustodyError,
    pub handle: H,
}

/// Holds and moves the fungible value backing ledger balances.
pub trait AssetCustody: Send + Sync {
    /// Opaque handle to an amount of custodied value.
    type Handle: Send;

    /// Creates a handle holding nothing.
    fn mint_zero(&self) -> Self::Handle;

    fn value_of(&self, handle: &Self::Handle) -> Amount;

    /// Takes `amount` out of `handle`, leaving the remainder in place.
    fn split(&self, handle: &mut Self::Handle, amount: Amount)
        -> Result<Self::Handle, CustodyError>;

    /// Merges `extracted` into `handle`.
    fn join(
        &self,
        handle: &mut Self::Handle,
        extracted: Self::Handle,
    ) -> Result<(), Rejected<Self::Handle>>;

    /// Hands `extracted` over to `recipient`, outside the ledger.
    fn release_to(
        &self,
        recipient: &Address,
        extracted: Self::Handle,
    ) -> Result<(), Rejected<Self::Handle>>;
}

/// Value handle of [`InMemoryCustody`].
#[derive(Debug, PartialEq, Eq)]
pub struct Coin {
    value: Amount,
}

impl Coin {
    pub fn value(&self) -> Amount {
        self.value
    }
}

/// Process-local custody, used by tests and the demo binary.
///
/// Tracks how much has been released to each address and can be switched
/// into refusing releases or joins.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    released: Mutex<HashMap<Address, Amount>>,
    refuse_releases: AtomicBool,
    refuse_joins: AtomicBool,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a coin worth `value`, as if paid in by a caller.
    pub fn mint(&self, value: Amount) -> Coin {
        Coin { value }
    }

    /// Total released to `address` so far.
    pub fn released_to(&self, address: &Address) -> Amount {
        self.released
            .lock()
            .get(address)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn set_refuse_releases(&self, refuse: bool) {
        self.refuse_releases.store(refuse, Ordering::SeqCst);
    }

    pub fn set_refuse_joins(&self, refuse: bool) {
        self.refuse_joins.store(refuse, Ordering::SeqCst);
    }
}

impl AssetCustody for InMemoryCustody {
    type Handle = Coin;

    fn mint_zero(&self) -> Coin {
        Coin {
            value: Amount::ZERO,
        }
    }

    fn value_of(&self, handle: &Coin) -> Amount {
        handle.value
    }

    fn split(&self, handle: &mut Coin, amount: Amount) -> Result<Coin, CustodyError> {
        let remainder = handle
            .value
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientValue {
                available: handle.value,
                requested: amount,
            })?;
        handle.value = remainder;
        Ok(Coin { value: amount })
    }

    fn join(&self, handle: &mut Coin, extracted: Coin) -> Result<(), Rejected<Coin>> {
        if self.refuse_joins.load(Ordering::SeqCst) {
            return Err(Rejected {
                error: CustodyError::JoinRefused,
                handle: extracted,
            });
        }

        match handle.value.checked_add(extracted.value) {
            Some(total) => {
                handle.value = total;
                Ok(())
            }
            None => Err(Rejected {
                error: CustodyError::Overflow {
                    held: handle.value,
                    amount: extracted.value,
                },
                handle: extracted,
            }),
        }
    }

    fn release_to(&self, recipient: &Address, extracted: Coin) -> Result<(), Rejected<Coin>> {
        if self.refuse_releases.load(Ordering::SeqCst) {
            return Err(Rejected {
                error: CustodyError::ReleaseRefused(recipient.clone()),
                handle: extracted,
            });
        }

        let mut released = self.released.lock();
        let entry = released.entry(recipient.clone()).or_insert(Amount::ZERO);
        *entry = entry.checked_add(extracted.value).unwrap_or(Amount::MAX);
        Ok(())
    }
}
