//! The subscription token facade
//!
//! `SubscriptionToken` is the external surface of the engine. Each method is
//! one serialized operation over the shared state: it either completes or
//! returns an error having changed nothing. Operations on one agreement hold
//! its guard throughout, so concurrent callers see each other's effects only
//! once they have settled.
//!
//! Caller identity is an explicit argument. Authenticating the caller is the
//! host's job; the token trusts that `caller` is who invoked it.

use std::sync::Arc;

use alloy_primitives::{B256, U256};
use openibank_ledger::FungibleLedger;
use openibank_types::{
    ensure_account, AccountRole, Address, AgreementKey, PeriodIndex, Quota, Result, UnixSeconds,
};
use parking_lot::Mutex;

use crate::{
    remaining_quota, AgreementGuards, AllowanceLedger, Clock, PeriodSpendLedger, PermitRequest,
    PermitVerifier, SpendReceipt, SubscriptionConfig, SubscriptionEvent, SubscriptionSpender,
    SubscriptionState, SystemClock,
};

/// A fungible token extended with recurring subscription allowances
pub struct SubscriptionToken {
    config: SubscriptionConfig,
    verifier: PermitVerifier,
    guards: AgreementGuards,
    state: Mutex<SubscriptionState>,
    ledger: Arc<dyn FungibleLedger>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionToken {
    pub fn new(
        config: SubscriptionConfig,
        ledger: Arc<dyn FungibleLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let verifier = PermitVerifier::new(config.signing_domain());
        tracing::info!(
            name = %config.name,
            chain_id = config.chain_id,
            domain = %verifier.domain().separator(),
            "Subscription token ready"
        );

        Self {
            config,
            verifier,
            guards: AgreementGuards::new(),
            state: Mutex::new(SubscriptionState::new()),
            ledger,
            clock,
        }
    }

    /// Build a token on the wall clock
    pub fn with_system_clock(config: SubscriptionConfig, ledger: Arc<dyn FungibleLedger>) -> Self {
        Self::new(config, ledger, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    pub fn now(&self) -> UnixSeconds {
        self.clock.now()
    }

    // ── Authorization ────────────────────────────────────────────────────────

    /// Install an allowance from an owner's off-band signature
    pub fn permit_for_subscription(&self, request: &PermitRequest) -> Result<()> {
        let lock = self.guards.lock_for(&request.key());
        let _held = lock.lock();
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.verifier.apply(&mut state, request, now)?;
        Ok(())
    }

    /// Overwrite the allowance of `caller`'s agreement with `spender`
    pub fn approve_for_subscription(
        &self,
        caller: Address,
        spender: Address,
        value: Quota,
        interval: u64,
        expiry: UnixSeconds,
    ) -> Result<()> {
        let key = Self::owner_key(caller, spender, interval, expiry)?;
        let lock = self.guards.lock_for(&key);
        let _held = lock.lock();
        let mut state = self.state.lock();
        state.book.set_allowance(&key, value);
        state.record_approval(&key, value);
        Ok(())
    }

    /// Add `delta` to the allowance, failing on overflow
    pub fn increase_allowance_for_subscription(
        &self,
        caller: Address,
        spender: Address,
        delta: Quota,
        interval: u64,
        expiry: UnixSeconds,
    ) -> Result<()> {
        let key = Self::owner_key(caller, spender, interval, expiry)?;
        let lock = self.guards.lock_for(&key);
        let _held = lock.lock();
        let mut state = self.state.lock();
        let updated = state.book.increase_allowance(&key, delta)?;
        state.record_approval(&key, updated);
        Ok(())
    }

    /// Subtract `delta` from the allowance, failing on underflow.
    ///
    /// Spend already drawn in the current bucket is not reconciled; the lower
    /// allowance applies from the next pull on.
    pub fn decrease_allowance_for_subscription(
        &self,
        caller: Address,
        spender: Address,
        delta: Quota,
        interval: u64,
        expiry: UnixSeconds,
    ) -> Result<()> {
        let key = Self::owner_key(caller, spender, interval, expiry)?;
        let lock = self.guards.lock_for(&key);
        let _held = lock.lock();
        let mut state = self.state.lock();
        let updated = state.book.decrease_allowance(&key, delta)?;
        state.record_approval(&key, updated);
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Quota `spender` may still pull in the current bucket (zero once expired)
    pub fn allowance_for_subscription(
        &self,
        owner: Address,
        spender: Address,
        interval: u64,
        expiry: UnixSeconds,
    ) -> Result<Quota> {
        let key = AgreementKey::new(owner, spender, interval, expiry);
        let lock = self.guards.lock_for(&key);
        let _held = lock.lock();
        let now = self.clock.now();
        remaining_quota(&self.state.lock().book, &key, now)
    }

    /// Stored allowance without expiry or period gating
    pub fn stored_allowance(&self, key: &AgreementKey) -> Quota {
        let lock = self.guards.lock_for(key);
        let _held = lock.lock();
        self.state.lock().book.allowance(key)
    }

    /// Amount drawn in a given bucket
    pub fn spent_in_period(&self, key: &AgreementKey, period: PeriodIndex) -> Quota {
        let lock = self.guards.lock_for(key);
        let _held = lock.lock();
        self.state.lock().book.spent_in_period(key, period)
    }

    /// The bucket the clock is currently in for `key`
    pub fn current_period(&self, key: &AgreementKey) -> Result<PeriodIndex> {
        key.period_at(self.clock.now())
    }

    /// The nonce `owner`'s next permit must be signed over
    pub fn nonces(&self, owner: &Address) -> U256 {
        self.state.lock().nonces.current(owner)
    }

    /// Opaque identifier of the signing domain permits are verified under
    pub fn domain_separator(&self) -> B256 {
        self.verifier.domain().separator()
    }

    /// Live balance on the underlying ledger
    pub fn balance_of(&self, account: &Address) -> Quota {
        self.ledger.balance_of(account)
    }

    // ── Spend ────────────────────────────────────────────────────────────────

    /// Pull `amount` from `from` into `to` under `caller`'s agreement
    pub fn transfer_from_for_subscription(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Quota,
        interval: u64,
        expiry: UnixSeconds,
    ) -> Result<SpendReceipt> {
        ensure_account(&from, AccountRole::Owner)?;
        ensure_account(&caller, AccountRole::Spender)?;
        let key = AgreementKey::new(from, caller, interval, expiry);
        let now = self.clock.now();

        SubscriptionSpender::new(
            &self.guards,
            &self.state,
            self.ledger.as_ref(),
            self.config.prune_stale_periods,
        )
        .spend(&key, &to, amount, now)
    }

    // ── Events & maintenance ─────────────────────────────────────────────────

    /// Copy of every notification not yet drained
    pub fn events(&self) -> Vec<SubscriptionEvent> {
        self.state.lock().events.snapshot()
    }

    /// Take the recorded notifications, leaving the log empty.
    ///
    /// The log grows until this is called; hosts that publish events should
    /// drain after each batch.
    pub fn drain_events(&self) -> Vec<SubscriptionEvent> {
        self.state.lock().events.drain()
    }

    /// Drop spend buckets older than the current one; returns how many
    pub fn prune_stale_periods(&self) -> usize {
        let now = self.clock.now();
        let pruned = self.state.lock().book.prune_stale(now);
        tracing::debug!(pruned, "Pruned stale spend periods");
        pruned
    }

    fn owner_key(
        caller: Address,
        spender: Address,
        interval: u64,
        expiry: UnixSeconds,
    ) -> Result<AgreementKey> {
        ensure_account(&caller, AccountRole::Owner)?;
        ensure_account(&spender, AccountRole::Spender)?;
        let key = AgreementKey::new(caller, spender, interval, expiry);
        key.validate()?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use openibank_ledger::InMemoryLedger;
    use openibank_types::SubscriptionError;

    const DAY: u64 = 86_400;
    const T0: u64 = 20_000 * DAY;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }

    fn spender() -> Address {
        Address::repeat_byte(0x02)
    }

    fn token() -> (SubscriptionToken, InMemoryLedger, Arc<ManualClock>) {
        let ledger = InMemoryLedger::new();
        let clock = Arc::new(ManualClock::new(T0));
        let token = SubscriptionToken::new(
            SubscriptionConfig::for_demo(),
            Arc::new(ledger.clone()),
            clock.clone(),
        );
        (token, ledger, clock)
    }

    #[test]
    fn test_approve_emits_real_caller_and_expiry() {
        let (token, _, _) = token();
        token
            .approve_for_subscription(owner(), spender(), Quota::from_units(100), DAY, T0 + 5)
            .unwrap();

        assert_eq!(
            token.events(),
            vec![SubscriptionEvent::ApprovalForSubscription {
                owner: owner(),
                spender: spender(),
                amount: Quota::from_units(100),
                interval: DAY,
                expiry: T0 + 5,
            }]
        );
    }

    #[test]
    fn test_increase_and_decrease_emit_resulting_amount() {
        let (token, _, _) = token();
        token
            .approve_for_subscription(owner(), spender(), Quota::from_units(100), DAY, 0)
            .unwrap();
        token
            .increase_allowance_for_subscription(owner(), spender(), Quota::from_units(20), DAY, 0)
            .unwrap();
        token
            .decrease_allowance_for_subscription(owner(), spender(), Quota::from_units(50), DAY, 0)
            .unwrap();

        let amounts: Vec<Quota> = token
            .drain_events()
            .into_iter()
            .map(|e| match e {
                SubscriptionEvent::ApprovalForSubscription { amount, .. } => amount,
            })
            .collect();
        assert_eq!(
            amounts,
            vec![Quota::from_units(100), Quota::from_units(120), Quota::from_units(70)]
        );
        assert!(token.events().is_empty());
    }

    #[test]
    fn test_failed_mutation_emits_nothing() {
        let (token, _, _) = token();
        let err = token
            .decrease_allowance_for_subscription(owner(), spender(), Quota::from_units(1), DAY, 0)
            .unwrap_err();
        assert_eq!(err, SubscriptionError::ArithmeticUnderflow);
        assert!(token.events().is_empty());
    }

    #[test]
    fn test_zero_interval_and_accounts_rejected() {
        let (token, _, _) = token();
        assert_eq!(
            token.approve_for_subscription(owner(), spender(), Quota::from_units(1), 0, 0),
            Err(SubscriptionError::InvalidInterval)
        );
        assert_eq!(
            token.approve_for_subscription(owner(), Address::ZERO, Quota::from_units(1), DAY, 0),
            Err(SubscriptionError::InvalidAccount { role: AccountRole::Spender })
        );
    }

    #[test]
    fn test_transfer_to_zero_address_rejected_without_commit() {
        let (token, ledger, _) = token();
        ledger.mint(&owner(), Quota::from_units(500)).unwrap();
        token
            .approve_for_subscription(owner(), spender(), Quota::from_units(100), DAY, 0)
            .unwrap();

        let err = token
            .transfer_from_for_subscription(spender(), owner(), Address::ZERO, Quota::from_units(10), DAY, 0)
            .unwrap_err();
        assert_eq!(err, SubscriptionError::InvalidAccount { role: AccountRole::Recipient });
        assert_eq!(
            token.allowance_for_subscription(owner(), spender(), DAY, 0).unwrap(),
            Quota::from_units(100)
        );
    }

    #[test]
    fn test_receipt_reports_period_and_remaining() {
        let (token, ledger, _) = token();
        ledger.mint(&owner(), Quota::from_units(500)).unwrap();
        token
            .approve_for_subscription(owner(), spender(), Quota::from_units(100), DAY, 0)
            .unwrap();

        let receipt = token
            .transfer_from_for_subscription(spender(), owner(), spender(), Quota::from_units(30), DAY, 0)
            .unwrap();
        assert_eq!(receipt.period, PeriodIndex(20_000));
        assert_eq!(receipt.remaining, Quota::from_units(70));
        assert_eq!(
            token.spent_in_period(&receipt.key, receipt.period),
            Quota::from_units(30)
        );
        assert_eq!(token.current_period(&receipt.key).unwrap(), receipt.period);
    }

    #[test]
    fn test_prune_stale_periods() {
        let (token, ledger, clock) = token();
        ledger.mint(&owner(), Quota::from_units(500)).unwrap();
        token
            .approve_for_subscription(owner(), spender(), Quota::from_units(100), DAY, 0)
            .unwrap();
        for _ in 0..3 {
            token
                .transfer_from_for_subscription(spender(), owner(), spender(), Quota::from_units(10), DAY, 0)
                .unwrap();
            clock.advance(DAY);
        }

        assert_eq!(token.prune_stale_periods(), 3);
        assert_eq!(token.prune_stale_periods(), 0);
    }

    #[test]
    fn test_domain_separator_matches_config() {
        let (token, _, _) = token();
        assert_eq!(
            token.domain_separator(),
            SubscriptionConfig::for_demo().signing_domain().separator()
        );
    }
}
