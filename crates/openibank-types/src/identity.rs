//! Identity types for OpeniBank subscriptions
//!
//! Accounts are Ethereum-style 20-byte addresses so that owners can authorize
//! spenders with secp256k1 signatures produced off-band.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, SubscriptionError};

pub use alloy_primitives::Address;

/// The role an account plays in a subscription operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountRole {
    /// The principal whose balance is drawn
    Owner,
    /// The counterparty allowed to pull funds
    Spender,
    /// The destination of a pull
    Recipient,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Owner => "owner",
            AccountRole::Spender => "spender",
            AccountRole::Recipient => "recipient",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject the zero address for the given role.
pub fn ensure_account(account: &Address, role: AccountRole) -> Result<()> {
    if account.is_zero() {
        return Err(SubscriptionError::InvalidAccount { role });
    }
    Ok(())
}
