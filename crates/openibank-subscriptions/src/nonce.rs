//! Per-owner permit nonces
//!
//! Each owner's nonce starts at zero and moves forward by exactly one for
//! every permit that verifies. It is never reset. Because the current nonce
//! is part of the signed payload, a consumed signature can never verify again.

use std::collections::HashMap;

use alloy_primitives::U256;
use openibank_types::{Address, Result, SubscriptionError};

/// Replay-protection counters keyed by owner
#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    nonces: HashMap<Address, U256>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nonce the owner's next permit must be signed over
    pub fn current(&self, owner: &Address) -> U256 {
        self.nonces.get(owner).copied().unwrap_or(U256::ZERO)
    }

    /// Consume the current nonce, returning the value that was consumed
    pub fn consume(&mut self, owner: &Address) -> Result<U256> {
        let current = self.current(owner);
        let next = current
            .checked_add(U256::from(1u64))
            .ok_or(SubscriptionError::ArithmeticOverflow)?;
        self.nonces.insert(*owner, next);
        Ok(current)
    }
}
