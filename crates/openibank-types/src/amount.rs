//! Quota amounts with 256-bit precision
//!
//! Allowances and per-period spend are whole, non-negative 256-bit integers.
//! Every arithmetic operation is checked and reports overflow or underflow as
//! an explicit error rather than wrapping.

use crate::{Result, SubscriptionError};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 256-bit unsigned quota amount in the token's smallest unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quota(pub U256);

impl Quota {
    /// The zero amount
    pub const ZERO: Self = Self(U256::ZERO);

    /// The largest representable amount
    pub const MAX: Self = Self(U256::MAX);

    /// Create a quota from a raw 256-bit value
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Create a quota from a machine-sized number of units
    pub fn from_units(units: u64) -> Self {
        Self(U256::from(units))
    }

    /// Get the raw 256-bit value
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition, failing with `ArithmeticOverflow`
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(SubscriptionError::ArithmeticOverflow)
    }

    /// Checked subtraction, failing with `ArithmeticUnderflow`
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(SubscriptionError::ArithmeticUnderflow)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Big-endian 32-byte encoding, as used in signing payloads
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }
}

impl From<u64> for Quota {
    fn from(units: u64) -> Self {
        Self::from_units(units)
    }
}

impl From<U256> for Quota {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<Quota> for U256 {
    fn from(quota: Quota) -> Self {
        quota.0
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
