//! Agreement keys and period buckets
//!
//! An agreement is identified by the full `(owner, spender, interval, expiry)`
//! tuple. Two agreements that differ only in expiry share no state.
//!
//! Spend is tracked per absolute bucket `floor(now / interval)`. Buckets are
//! aligned to the unix epoch and shared by every agreement with the same
//! interval; there is no explicit reset, moving into a new bucket is the reset.

use crate::{Address, Result, SubscriptionError, UnixSeconds};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expiry sentinel meaning the agreement never expires
pub const NEVER_EXPIRES: UnixSeconds = 0;

/// Composite key identifying one recurring-spend agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgreementKey {
    /// The principal whose balance is drawn
    pub owner: Address,
    /// The counterparty allowed to pull
    pub spender: Address,
    /// Recurrence interval in seconds (must be non-zero)
    pub interval: u64,
    /// Absolute expiry in unix seconds, or `NEVER_EXPIRES`
    pub expiry: UnixSeconds,
}

impl AgreementKey {
    pub fn new(owner: Address, spender: Address, interval: u64, expiry: UnixSeconds) -> Self {
        Self {
            owner,
            spender,
            interval,
            expiry,
        }
    }

    /// Reject a zero interval, which would leave the bucket index undefined
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(SubscriptionError::InvalidInterval);
        }
        Ok(())
    }

    /// Whether the agreement never expires
    pub fn is_perpetual(&self) -> bool {
        self.expiry == NEVER_EXPIRES
    }

    /// Expiry is strict: the expiry second itself is still usable.
    pub fn is_expired_at(&self, now: UnixSeconds) -> bool {
        !self.is_perpetual() && now > self.expiry
    }

    /// The absolute bucket `now` falls into
    pub fn period_at(&self, now: UnixSeconds) -> Result<PeriodIndex> {
        PeriodIndex::at(now, self.interval)
    }
}

impl fmt::Display for AgreementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} every {}s until {}",
            self.owner,
            self.spender,
            self.interval,
            if self.is_perpetual() {
                "never".to_string()
            } else {
                self.expiry.to_string()
            }
        )
    }
}

/// Absolute, epoch-aligned period bucket index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodIndex(pub u64);

impl PeriodIndex {
    /// `floor(now / interval)`
    pub fn at(now: UnixSeconds, interval: u64) -> Result<Self> {
        now.checked_div(interval)
            .map(Self)
            .ok_or(SubscriptionError::InvalidInterval)
    }

    /// First second covered by this bucket
    pub fn start(&self, interval: u64) -> Option<UnixSeconds> {
        self.0.checked_mul(interval)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeriodIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn key(expiry: UnixSeconds) -> AgreementKey {
        AgreementKey::new(
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0xbb),
            DAY,
            expiry,
        )
    }

    #[test]
    fn test_period_is_absolute() {
        // Both timestamps fall inside the same epoch-aligned day.
        let start_of_day = 19_000 * DAY;
        assert_eq!(key(0).period_at(start_of_day).unwrap(), PeriodIndex(19_000));
        assert_eq!(
            key(0).period_at(start_of_day + DAY - 1).unwrap(),
            PeriodIndex(19_000)
        );
        assert_eq!(
            key(0).period_at(start_of_day + DAY).unwrap(),
            PeriodIndex(19_001)
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut k = key(0);
        k.interval = 0;
        assert!(matches!(k.validate(), Err(SubscriptionError::InvalidInterval)));
        assert!(matches!(k.period_at(100), Err(SubscriptionError::InvalidInterval)));
    }

    #[test]
    fn test_expiry_gate() {
        let k = key(1_000);
        assert!(!k.is_expired_at(999));
        assert!(!k.is_expired_at(1_000));
        assert!(k.is_expired_at(1_001));

        let perpetual = key(NEVER_EXPIRES);
        assert!(!perpetual.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_keys_differ_by_expiry() {
        assert_ne!(key(1_000), key(2_000));
    }

    #[test]
    fn test_period_start() {
        assert_eq!(PeriodIndex(3).start(DAY), Some(3 * DAY));
    }

    #[test]
    fn test_key_serde() {
        let k = key(42);
        let json = serde_json::to_string(&k).unwrap();
        let back: AgreementKey = serde_json::from_str(&json).unwrap();
        assert_eq!(k, back);
    }
}
