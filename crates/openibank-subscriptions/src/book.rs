//! Agreement storage
//!
//! One map keyed by the full agreement tuple. Each record carries the
//! allowance and the amount drawn per absolute period bucket. Records are
//! never deleted; expired agreements are gated at read time.

use std::collections::{BTreeMap, HashMap};

use openibank_types::{Address, AgreementKey, PeriodIndex, Quota};
use serde::{Deserialize, Serialize};

/// Allowance and spend history of one agreement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRecord {
    /// Quota per period
    pub allowance: Quota,
    /// Amount drawn in each bucket that has seen a spend
    pub spent: BTreeMap<PeriodIndex, Quota>,
}

/// In-memory agreement store backing both the allowance and period ledgers
#[derive(Debug, Clone, Default)]
pub struct AgreementBook {
    records: HashMap<AgreementKey, AgreementRecord>,
}

impl AgreementBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AgreementKey) -> Option<&AgreementRecord> {
        self.records.get(key)
    }

    pub(crate) fn entry(&mut self, key: &AgreementKey) -> &mut AgreementRecord {
        self.records.entry(*key).or_default()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = (&AgreementKey, &mut AgreementRecord)> {
        self.records.iter_mut()
    }

    /// Agreements ever written
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Agreements where `owner` is the principal
    pub fn agreements_of(&self, owner: &Address) -> Vec<AgreementKey> {
        let mut keys: Vec<AgreementKey> = self
            .records
            .keys()
            .filter(|k| &k.owner == owner)
            .copied()
            .collect();
        keys.sort();
        keys
    }
}
