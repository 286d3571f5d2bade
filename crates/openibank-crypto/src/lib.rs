//! OpeniBank Crypto - Cryptographic primitives for subscription permits
//!
//! This crate provides:
//! - secp256k1 key generation and Ethereum-style address derivation
//! - Recoverable ECDSA signatures (65-byte `r || s || v`)
//! - Hashing (Keccak-256)
//! - Typed-data (EIP-712 style) domain separation for permits
//!
//! # Security Invariant
//!
//! **Verification is pure.** Recovering a signer never touches nonce or
//! allowance state; callers decide what to do with the recovered address.

pub mod keys;
pub mod signature;
pub mod hash;
pub mod typed_data;

pub use keys::*;
pub use signature::*;
pub use hash::*;
pub use typed_data::*;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Signer recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
