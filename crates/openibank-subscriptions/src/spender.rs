//! Subscription pulls
//!
//! A pull holds the agreement's guard for its whole duration and runs in two
//! phases around the external transfer:
//!
//! 1. Under the state lock: read the remaining quota for the current bucket,
//!    check the owner's live balance, and commit the spend to the bucket.
//! 2. State lock released, agreement guard still held: ask the ledger to move
//!    the funds. If the ledger refuses, roll the commit back.
//!
//! The commit lands before the transfer starts, so a transfer hook that
//! re-enters the token on the same thread sees the reduced quota and cannot
//! draw it twice. Other threads wait on the guard and only ever observe the
//! settled or rolled-back outcome.
//!
//! A nested pull made by a hook is its own operation. If it settles, its
//! transfer has happened and it stands even when the outer pull is then
//! rolled back; only the outer amount is removed from the bucket.

use openibank_ledger::{EntryId, FungibleLedger, LedgerError};
use openibank_types::{
    ensure_account, AccountRole, Address, AgreementKey, PeriodIndex, Quota, Result, SubscriptionError,
    UnixSeconds,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{remaining_quota, AgreementGuards, PeriodSpendLedger, SubscriptionState};

/// Outcome of a successful pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendReceipt {
    pub key: AgreementKey,
    pub period: PeriodIndex,
    pub amount: Quota,
    /// Quota left in the same bucket after this pull
    pub remaining: Quota,
    /// Debit entry written by the ledger
    pub entry_id: EntryId,
}

/// Orchestrates quota check, commit and transfer for one token
pub struct SubscriptionSpender<'a> {
    guards: &'a AgreementGuards,
    state: &'a Mutex<SubscriptionState>,
    ledger: &'a dyn FungibleLedger,
    prune_stale_periods: bool,
}

impl<'a> SubscriptionSpender<'a> {
    pub fn new(
        guards: &'a AgreementGuards,
        state: &'a Mutex<SubscriptionState>,
        ledger: &'a dyn FungibleLedger,
        prune_stale_periods: bool,
    ) -> Self {
        Self {
            guards,
            state,
            ledger,
            prune_stale_periods,
        }
    }

    /// Pull `amount` under `key` into `to` at time `now`
    pub fn spend(
        &self,
        key: &AgreementKey,
        to: &Address,
        amount: Quota,
        now: UnixSeconds,
    ) -> Result<SpendReceipt> {
        key.validate()?;
        ensure_account(to, AccountRole::Recipient)?;

        let lock = self.guards.lock_for(key);
        let _held = lock.lock();

        let (period, remaining) = self.reserve(key, amount, now)?;

        match self.ledger.transfer(&key.owner, to, amount) {
            Ok(entry_id) => {
                tracing::info!(
                    owner = %key.owner,
                    spender = %key.spender,
                    to = %to,
                    amount = %amount,
                    period = period.value(),
                    "Subscription pull settled"
                );
                Ok(SpendReceipt {
                    key: *key,
                    period,
                    amount,
                    remaining,
                    entry_id,
                })
            }
            Err(e) => {
                self.state.lock().book.rollback_spend(key, period, amount);
                tracing::warn!(
                    owner = %key.owner,
                    spender = %key.spender,
                    amount = %amount,
                    period = period.value(),
                    error = %e,
                    "Subscription pull rolled back"
                );
                Err(match e {
                    // The balance moved while the transfer was in flight.
                    LedgerError::InsufficientBalance { available, .. } => {
                        SubscriptionError::InsufficientBalance {
                            requested: amount,
                            available,
                        }
                    }
                    other => SubscriptionError::transfer_failed(other.to_string()),
                })
            }
        }
    }

    /// Check quota and balance, then commit, all under one lock acquisition
    fn reserve(
        &self,
        key: &AgreementKey,
        amount: Quota,
        now: UnixSeconds,
    ) -> Result<(PeriodIndex, Quota)> {
        let mut state = self.state.lock();

        let available = remaining_quota(&state.book, key, now)?;
        if amount > available {
            tracing::debug!(
                owner = %key.owner,
                spender = %key.spender,
                requested = %amount,
                available = %available,
                "Pull exceeds remaining quota"
            );
            return Err(SubscriptionError::InsufficientAllowance {
                requested: amount,
                available,
            });
        }

        let balance = self.ledger.balance_of(&key.owner);
        if amount > balance {
            return Err(SubscriptionError::InsufficientBalance {
                requested: amount,
                available: balance,
            });
        }

        let period = state.book.commit_spend(key, now, amount)?;
        if self.prune_stale_periods {
            state.book.prune_before(key, period);
        }

        // amount <= available, so this cannot underflow.
        Ok((period, available.saturating_sub(amount)))
    }
}
