//! Shared token state
//!
//! Everything a single operation may touch lives behind one lock in
//! `SubscriptionToken`, so each operation observes and leaves a consistent
//! snapshot.

use openibank_types::{AgreementKey, Quota};

use crate::{AgreementBook, EventLog, NonceRegistry, SubscriptionEvent};

#[derive(Debug, Default)]
pub struct SubscriptionState {
    pub book: AgreementBook,
    pub nonces: NonceRegistry,
    pub events: EventLog,
}

impl SubscriptionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the notification for a successful allowance mutation
    pub fn record_approval(&mut self, key: &AgreementKey, amount: Quota) {
        tracing::info!(
            owner = %key.owner,
            spender = %key.spender,
            amount = %amount,
            interval = key.interval,
            expiry = key.expiry,
            "ApprovalForSubscription"
        );
        self.events.push(SubscriptionEvent::approval(key, amount));
    }
}
