//! Period spend ledger and the quota read
//!
//! Spend is recorded per absolute bucket `floor(now / interval)`. Moving
//! into a new bucket is what replenishes the quota; there is no explicit
//! rollover step, and the current bucket is always derived from the clock
//! at the moment of the read or commit.

use openibank_types::{AgreementKey, PeriodIndex, Quota, Result, UnixSeconds};

use crate::{AgreementBook, AllowanceLedger};

/// Storage of amounts drawn per agreement and bucket
pub trait PeriodSpendLedger {
    /// Amount already drawn in `period`
    fn spent_in_period(&self, key: &AgreementKey, period: PeriodIndex) -> Quota;

    /// Overwrite the amount drawn in `period`
    fn set_spent(&mut self, key: &AgreementKey, period: PeriodIndex, amount: Quota);

    /// Drop buckets strictly older than `period`, returning how many went
    fn prune_before(&mut self, key: &AgreementKey, period: PeriodIndex) -> usize;

    /// Add `amount` to the bucket `now` falls into, returning that bucket
    fn commit_spend(
        &mut self,
        key: &AgreementKey,
        now: UnixSeconds,
        amount: Quota,
    ) -> Result<PeriodIndex> {
        let period = key.period_at(now)?;
        let updated = self.spent_in_period(key, period).checked_add(amount)?;
        self.set_spent(key, period, updated);
        Ok(period)
    }

    /// Undo a commit whose transfer did not go through
    fn rollback_spend(&mut self, key: &AgreementKey, period: PeriodIndex, amount: Quota) {
        // A rollback only ever removes what the matching commit added.
        let restored = self.spent_in_period(key, period).saturating_sub(amount);
        self.set_spent(key, period, restored);
    }
}

impl PeriodSpendLedger for AgreementBook {
    fn spent_in_period(&self, key: &AgreementKey, period: PeriodIndex) -> Quota {
        self.get(key)
            .and_then(|r| r.spent.get(&period).copied())
            .unwrap_or_default()
    }

    fn set_spent(&mut self, key: &AgreementKey, period: PeriodIndex, amount: Quota) {
        self.entry(key).spent.insert(period, amount);
    }

    fn prune_before(&mut self, key: &AgreementKey, period: PeriodIndex) -> usize {
        let record = self.entry(key);
        let before = record.spent.len();
        record.spent = record.spent.split_off(&period);
        before - record.spent.len()
    }
}

impl AgreementBook {
    /// Drop every bucket older than the current one across all agreements
    pub fn prune_stale(&mut self, now: UnixSeconds) -> usize {
        let mut pruned = 0;
        for (key, record) in self.records_mut() {
            // Zero intervals are rejected before anything is written.
            let Ok(current) = key.period_at(now) else {
                continue;
            };
            let before = record.spent.len();
            record.spent = record.spent.split_off(&current);
            pruned += before - record.spent.len();
        }
        pruned
    }
}

/// Quota still available to the spender in the bucket `now` falls into.
///
/// Expired agreements read as zero whatever is stored. If the allowance was
/// lowered below what the bucket already drew, the result floors at zero.
pub fn remaining_quota<B>(book: &B, key: &AgreementKey, now: UnixSeconds) -> Result<Quota>
where
    B: AllowanceLedger + PeriodSpendLedger,
{
    key.validate()?;
    if key.is_expired_at(now) {
        return Ok(Quota::ZERO);
    }

    let period = key.period_at(now)?;
    let allowance = book.allowance(key);
    let spent = book.spent_in_period(key, period);
    Ok(allowance.saturating_sub(spent))
}
