//! Allowance ledger
//!
//! Quota amounts keyed by agreement. `set_allowance` overwrites; increase and
//! decrease are additive and checked, so a failed call leaves the stored
//! amount untouched. Reads are raw: expiry gating belongs to the quota read
//! in `period`.

use openibank_types::{AgreementKey, Quota, Result};

use crate::AgreementBook;

/// Storage of per-agreement quota amounts
pub trait AllowanceLedger {
    /// Stored allowance, with no time gating
    fn allowance(&self, key: &AgreementKey) -> Quota;

    /// Unconditional overwrite
    fn set_allowance(&mut self, key: &AgreementKey, amount: Quota);

    /// `allowance += delta`, failing with `ArithmeticOverflow` past the maximum
    fn increase_allowance(&mut self, key: &AgreementKey, delta: Quota) -> Result<Quota> {
        let updated = self.allowance(key).checked_add(delta)?;
        self.set_allowance(key, updated);
        Ok(updated)
    }

    /// `allowance -= delta`, failing with `ArithmeticUnderflow` below zero
    fn decrease_allowance(&mut self, key: &AgreementKey, delta: Quota) -> Result<Quota> {
        let updated = self.allowance(key).checked_sub(delta)?;
        self.set_allowance(key, updated);
        Ok(updated)
    }
}

impl AllowanceLedger for AgreementBook {
    fn allowance(&self, key: &AgreementKey) -> Quota {
        self.get(key).map(|r| r.allowance).unwrap_or_default()
    }

    fn set_allowance(&mut self, key: &AgreementKey, amount: Quota) {
        self.entry(key).allowance = amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openibank_types::{Address, SubscriptionError};

    fn key() -> AgreementKey {
        AgreementKey::new(Address::repeat_byte(1), Address::repeat_byte(2), 86_400, 0)
    }

    #[test]
    fn test_unknown_agreement_reads_zero() {
        let book = AgreementBook::new();
        assert_eq!(book.allowance(&key()), Quota::ZERO);
        assert!(book.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let mut book = AgreementBook::new();
        book.set_allowance(&key(), Quota::from_units(100));
        book.set_allowance(&key(), Quota::from_units(30));
        assert_eq!(book.allowance(&key()), Quota::from_units(30));
    }

    #[test]
    fn test_increase_then_decrease_restores() {
        let mut book = AgreementBook::new();
        book.set_allowance(&key(), Quota::from_units(100));

        assert_eq!(
            book.increase_allowance(&key(), Quota::from_units(25)).unwrap(),
            Quota::from_units(125)
        );
        assert_eq!(
            book.decrease_allowance(&key(), Quota::from_units(25)).unwrap(),
            Quota::from_units(100)
        );
    }

    #[test]
    fn test_increase_overflow_is_atomic() {
        let mut book = AgreementBook::new();
        book.set_allowance(&key(), Quota::MAX);

        let err = book.increase_allowance(&key(), Quota::from_units(1)).unwrap_err();
        assert!(matches!(err, SubscriptionError::ArithmeticOverflow));
        assert_eq!(book.allowance(&key()), Quota::MAX);
    }

    #[test]
    fn test_decrease_underflow_is_atomic() {
        let mut book = AgreementBook::new();
        book.set_allowance(&key(), Quota::from_units(10));

        let err = book.decrease_allowance(&key(), Quota::from_units(11)).unwrap_err();
        assert!(matches!(err, SubscriptionError::ArithmeticUnderflow));
        assert_eq!(book.allowance(&key()), Quota::from_units(10));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut book = AgreementBook::new();
        let mut later = key();
        later.expiry = 2_000_000_000;

        book.set_allowance(&key(), Quota::from_units(100));
        assert_eq!(book.allowance(&later), Quota::ZERO);
        assert_eq!(book.agreements_of(&key().owner), vec![key()]);
    }
}
