//! OpeniBank Subscriptions - Recurring allowances for a fungible token
//!
//! An owner grants a spender a quota that replenishes every `interval`
//! seconds, optionally until an expiry. The spender pulls funds at will, up to
//! the quota in the current period. Allowances can be granted directly by the
//! owner or from a signed, single-use permit.
//!
//! # Invariants
//!
//! 1. Spend in a period never exceeds the allowance read at pull time
//! 2. Every permit nonce is usable once
//! 3. A failed operation leaves no trace in state
//!
//! Agreements are keyed by `(owner, spender, interval, expiry)`; changing
//! any part of the key addresses an independent agreement.

pub mod book;
pub mod allowance;
pub mod period;
pub mod nonce;
pub mod events;
pub mod state;
pub mod permit;
pub mod guard;
pub mod spender;
pub mod clock;
pub mod config;
pub mod token;

pub use book::*;
pub use allowance::*;
pub use period::*;
pub use nonce::*;
pub use events::*;
pub use state::*;
pub use permit::*;
pub use guard::*;
pub use spender::*;
pub use clock::*;
pub use config::*;
pub use token::*;

/// Common imports for hosts embedding the token
pub mod prelude {
    pub use crate::{
        Clock, ManualClock, PermitRequest, SpendReceipt, SubscriptionConfig, SubscriptionEvent,
        SubscriptionToken, SystemClock,
    };
    pub use openibank_ledger::{FungibleLedger, InMemoryLedger};
    pub use openibank_types::{Address, AgreementKey, PeriodIndex, Quota, SubscriptionError};
}
