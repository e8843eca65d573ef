//! Unsigned ledger amounts with checked arithmetic.
//!
//! Balances never wrap: additions that would exceed `u64::MAX` and
//! subtractions below zero are reported instead of applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// A non-negative quantity of value held by an account.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use account_ledger::Amount;
///
/// let amount = Amount::from_str(" 40 ").unwrap();
/// assert_eq!(amount.checked_add(Amount::new(2)), Some(Amount::new(42)));
/// assert_eq!(amount.checked_sub(Amount::new(41)), None);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Amount(0);

    /// Largest representable amount.
    pub const MAX: Self = Amount(u64::MAX);

    pub const fn new(value: u64) -> Self {
        Amount(value)
    }

    /// Returns the raw integer value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds `rhs`, returning `None` on overflow.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Subtracts `rhs`, returning `None` if the result would be negative.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_trims_whitespace() {
        assert_eq!(Amount::from_str("  250 ").unwrap(), Amount::new(250));
    }

    #[test]
    fn test_from_str_rejects_negative_and_fractional() {
        assert!(Amount::from_str("-1").is_err());
        assert!(Amount::from_str("1.5").is_err());
        assert!(Amount::from_str("").is_err());
    }

    #[test]
    fn test_checked_add_detects_overflow() {
        assert_eq!(Amount::MAX.checked_add(Amount::new(1)), None);
        assert_eq!(
            Amount::new(u64::MAX - 1).checked_add(Amount::new(1)),
            Some(Amount::MAX)
        );
    }

    #[test]
    fn test_checked_sub_never_goes_negative() {
        assert_eq!(Amount::new(10).checked_sub(Amount::new(10)), Some(Amount::ZERO));
        assert_eq!(Amount::new(10).checked_sub(Amount::new(11)), None);
    }

    #[test]
    fn test_zero_constant() {
        assert!(Amount::ZERO.is_zero());
        assert!(!Amount::new(1).is_zero());
    }
}
