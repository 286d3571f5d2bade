//! OpeniBank Ledger - Fungible balance ledger for subscription pulls
//!
//! The ledger is:
//! - Account-keyed by address
//! - Double-entry (every transfer debits one account and credits another)
//! - Immutable (entries are append-only)
//! - Hookable (transfer hooks run before a transfer is applied and may veto it)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Every entry has a reason
//! 3. Total supply equals the sum of all balances
//! 4. Atomic operations only: a rejected transfer leaves no trace

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use openibank_types::{Address, Quota};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Quota, required: Quota },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid account: {account}")]
    InvalidAccount { account: Address },

    #[error("Transfer rejected by hook: {reason}")]
    TransferRejected { reason: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// The value-movement collaborator consumed by the subscription engine
pub trait FungibleLedger: Send + Sync {
    /// Live balance of an account (zero if never seen)
    fn balance_of(&self, account: &Address) -> Quota;

    /// Move `amount` from `from` to `to`, all-or-nothing
    fn transfer(&self, from: &Address, to: &Address, amount: Quota) -> Result<EntryId>;
}

/// Callback invoked before a transfer is applied.
///
/// Hooks run without any ledger lock held, so they may call back into the
/// ledger or into whoever initiated the transfer. Returning `Err` vetoes the
/// transfer.
pub trait TransferHook: Send + Sync {
    fn before_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Quota,
    ) -> std::result::Result<(), String>;
}

/// Unique identifier for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(format!("entry_{}", Uuid::new_v4()))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Credit (increase) to an account
    Credit,
    /// Debit (decrease) from an account
    Debit,
}

/// Reason for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// New supply
    Mint,
    /// Destroyed supply
    Burn,
    /// Transfer between accounts
    Transfer { counterparty: Address },
}

/// A single ledger entry (one side of a double-entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub account: Address,
    pub entry_type: EntryType,
    pub amount: Quota,
    pub balance_after: Quota,
    pub reason: EntryReason,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Address, Quota>,
    entries: Vec<LedgerEntry>,
    total_supply: Quota,
}

impl LedgerState {
    fn balance(&self, account: &Address) -> Quota {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn record(
        &mut self,
        account: Address,
        entry_type: EntryType,
        amount: Quota,
        balance_after: Quota,
        reason: EntryReason,
    ) -> EntryId {
        let entry = LedgerEntry {
            entry_id: EntryId::new(),
            account,
            entry_type,
            amount,
            balance_after,
            reason,
            created_at: Utc::now(),
        };
        let entry_id = entry.entry_id.clone();
        self.balances.insert(account, balance_after);
        self.entries.push(entry);
        entry_id
    }
}

/// In-memory fungible ledger
///
/// Thread-safe and cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    hooks: Arc<RwLock<Vec<Arc<dyn TransferHook>>>>,
}

impl InMemoryLedger {
    /// Create a new in-memory ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook that runs before every transfer
    pub fn add_hook(&self, hook: Arc<dyn TransferHook>) {
        self.hooks.write().push(hook);
    }

    /// Create new supply in `to`
    pub fn mint(&self, to: &Address, amount: Quota) -> Result<Quota> {
        if to.is_zero() {
            return Err(LedgerError::InvalidAccount { account: *to });
        }
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                message: "Amount must be greater than zero".to_string(),
            });
        }

        let mut state = self.state.write();
        let overflow = |_| LedgerError::InvalidAmount {
            message: "Supply overflow".to_string(),
        };
        let total_supply = state.total_supply.checked_add(amount).map_err(overflow)?;
        let new_balance = state.balance(to).checked_add(amount).map_err(overflow)?;

        state.total_supply = total_supply;
        state.record(*to, EntryType::Credit, amount, new_balance, EntryReason::Mint);

        tracing::debug!(account = %to, amount = %amount, "Minted");
        Ok(new_balance)
    }

    /// Destroy supply held by `from`
    pub fn burn(&self, from: &Address, amount: Quota) -> Result<Quota> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                message: "Amount must be greater than zero".to_string(),
            });
        }

        let mut state = self.state.write();
        let current = state.balance(from);
        let new_balance = current
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientBalance {
                available: current,
                required: amount,
            })?;
        // Supply always covers any single balance.
        state.total_supply = state.total_supply.saturating_sub(amount);
        state.record(*from, EntryType::Debit, amount, new_balance, EntryReason::Burn);

        tracing::debug!(account = %from, amount = %amount, "Burned");
        Ok(new_balance)
    }

    /// Total supply across all accounts
    pub fn total_supply(&self) -> Quota {
        self.state.read().total_supply
    }

    /// Get all entries for an account
    pub fn account_entries(&self, account: &Address) -> Vec<LedgerEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect()
    }

    /// Get the total number of entries
    pub fn entry_count(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Get recent entries (newest first)
    pub fn recent_entries(&self, limit: usize) -> Vec<LedgerEntry> {
        self.state.read().entries.iter().rev().take(limit).cloned().collect()
    }

    fn run_hooks(&self, from: &Address, to: &Address, amount: Quota) -> Result<()> {
        // Snapshot so hooks can register further hooks or re-enter freely.
        let hooks: Vec<Arc<dyn TransferHook>> = self.hooks.read().clone();
        for hook in hooks {
            hook.before_transfer(from, to, amount)
                .map_err(|reason| LedgerError::TransferRejected { reason })?;
        }
        Ok(())
    }
}

impl FungibleLedger for InMemoryLedger {
    fn balance_of(&self, account: &Address) -> Quota {
        self.state.read().balance(account)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Quota) -> Result<EntryId> {
        if from.is_zero() {
            return Err(LedgerError::InvalidAccount { account: *from });
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidAccount { account: *to });
        }

        let available = self.balance_of(from);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        self.run_hooks(from, to, amount)?;

        // Hooks may have moved funds; check again under the write lock.
        let mut state = self.state.write();
        let available = state.balance(from);
        let from_after = available
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientBalance {
                available,
                required: amount,
            })?;

        let debit = if from == to {
            // Balance is unchanged; only the debit side is journaled.
            state.record(
                *from,
                EntryType::Debit,
                amount,
                available,
                EntryReason::Transfer { counterparty: *to },
            )
        } else {
            let to_after = state
                .balance(to)
                .checked_add(amount)
                .map_err(|_| LedgerError::InvalidAmount {
                    message: "Balance overflow".to_string(),
                })?;
            let debit = state.record(
                *from,
                EntryType::Debit,
                amount,
                from_after,
                EntryReason::Transfer { counterparty: *to },
            );
            state.record(
                *to,
                EntryType::Credit,
                amount,
                to_after,
                EntryReason::Transfer { counterparty: *from },
            );
            debit
        };

        tracing::debug!(from = %from, to = %to, amount = %amount, "Transferred");
        Ok(debit)
    }
}
