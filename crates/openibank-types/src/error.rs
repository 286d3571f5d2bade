//! Error types for OpeniBank subscriptions
//!
//! Every failure aborts the whole operation with no mutation. Nothing here
//! is retried internally; callers resubmit with corrected inputs.

use crate::{AccountRole, Quota, UnixSeconds};
use thiserror::Error;

/// Result type for subscription operations
pub type Result<T> = std::result::Result<T, SubscriptionError>;

/// Subscription error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    // ========================================================================
    // Permit Errors
    // ========================================================================

    /// Permit submitted after its deadline
    #[error("Permit deadline {deadline} has passed (now {now})")]
    ExpiredDeadline { deadline: UnixSeconds, now: UnixSeconds },

    /// Recovered signer does not match the claimed owner
    ///
    /// Forged, replayed and tampered permits all map here.
    #[error("Invalid signature")]
    InvalidSignature,

    // ========================================================================
    // Spend Errors
    // ========================================================================

    /// Requested spend exceeds the remaining quota of the current period
    #[error("Insufficient allowance: requested {requested}, available {available}")]
    InsufficientAllowance { requested: Quota, available: Quota },

    /// Owner's live balance cannot cover the spend
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Quota, available: Quota },

    /// The ledger rejected the transfer; the period commit was rolled back
    #[error("Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // ========================================================================
    // Arithmetic Errors
    // ========================================================================

    /// Quota overflow during arithmetic
    #[error("Quota overflow during arithmetic operation")]
    ArithmeticOverflow,

    /// Quota underflow during arithmetic
    #[error("Quota underflow during arithmetic operation")]
    ArithmeticUnderflow,

    // ========================================================================
    // Input Errors
    // ========================================================================

    /// Recurrence interval must be non-zero
    #[error("Recurrence interval must be greater than zero")]
    InvalidInterval,

    /// Zero address supplied for a role that requires a real account
    #[error("Invalid {role} account: zero address")]
    InvalidAccount { role: AccountRole },
}

impl SubscriptionError {
    /// Create a transfer failure
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }

    /// Check if this is a retriable error
    ///
    /// No subscription failure is retriable as-is: a permit needs a fresh
    /// deadline or signature, a spend needs a smaller amount or a later period.
    pub fn is_retriable(&self) -> bool {
        false
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExpiredDeadline { .. } => "EXPIRED_DEADLINE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
            Self::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
            Self::ArithmeticUnderflow => "ARITHMETIC_UNDERFLOW",
            Self::InvalidInterval => "INVALID_INTERVAL",
            Self::InvalidAccount { .. } => "INVALID_ACCOUNT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SubscriptionError::InsufficientAllowance {
            requested: Quota::from_units(100),
            available: Quota::ZERO,
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_ALLOWANCE");
        assert_eq!(SubscriptionError::InvalidSignature.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_nothing_is_retriable() {
        assert!(!SubscriptionError::transfer_failed("hook").is_retriable());
        assert!(!SubscriptionError::ArithmeticOverflow.is_retriable());
    }

    #[test]
    fn test_messages() {
        let err = SubscriptionError::ExpiredDeadline { deadline: 10, now: 11 };
        assert_eq!(err.to_string(), "Permit deadline 10 has passed (now 11)");

        let err = SubscriptionError::InvalidAccount { role: AccountRole::Spender };
        assert_eq!(err.to_string(), "Invalid spender account: zero address");
    }
}
