//! Audit notifications
//!
//! Every successful allowance mutation (approve, increase, decrease, permit)
//! records an `ApprovalForSubscription` carrying the acting owner, the
//! spender, the resulting allowance and the agreement's interval and expiry
//! exactly as they were passed to the call.

use openibank_types::{Address, AgreementKey, Quota, UnixSeconds};
use serde::{Deserialize, Serialize};

/// Notifications emitted by the subscription token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    ApprovalForSubscription {
        owner: Address,
        spender: Address,
        amount: Quota,
        interval: u64,
        expiry: UnixSeconds,
    },
}

impl SubscriptionEvent {
    pub fn approval(key: &AgreementKey, amount: Quota) -> Self {
        Self::ApprovalForSubscription {
            owner: key.owner,
            spender: key.spender,
            amount,
            interval: key.interval,
            expiry: key.expiry,
        }
    }
}

/// Append-only event log, drained by whoever audits the token.
///
/// The log is unbounded. Hosts are expected to call `drain` (through
/// `SubscriptionToken::drain_events`) on their own schedule; `snapshot`
/// copies the whole backlog and is meant for tests and inspection.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SubscriptionEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: SubscriptionEvent) {
        self.events.push(event);
    }

    pub fn snapshot(&self) -> Vec<SubscriptionEvent> {
        self.events.clone()
    }

    pub fn drain(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
