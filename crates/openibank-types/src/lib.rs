//! OpeniBank Types - Canonical domain types for subscription allowances
//!
//! This crate contains the foundational types shared by the subscription
//! engine and its collaborators, with zero dependencies on other openibank
//! crates:
//!
//! - Account identity (20-byte addresses) and account roles
//! - 256-bit quota amounts with checked arithmetic
//! - Agreement keys and absolute period buckets
//! - The subscription error taxonomy
//!
//! # Invariants
//!
//! 1. Quota arithmetic never wraps: overflow and underflow are errors
//! 2. Period buckets are derived from absolute time, never from agreement start
//! 3. Failure must be explicit

pub mod identity;
pub mod amount;
pub mod agreement;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use agreement::*;
pub use error::*;

/// Version of the OpeniBank subscription types schema
pub const TYPES_VERSION: &str = "0.1.0";

/// Seconds since the unix epoch.
pub type UnixSeconds = u64;
