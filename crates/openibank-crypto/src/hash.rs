//! Hashing utilities for OpeniBank

use sha3::{Digest, Keccak256};

/// Compute Keccak-256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute Keccak-256 hash and return as hex string
pub fn keccak256_hex(data: &[u8]) -> String {
    hex::encode(keccak256(data))
}

/// Compute hash of multiple items, concatenated in order
pub fn hash_all(items: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for item in items {
        hasher.update(item);
    }
    hasher.finalize().into()
}

/// Compute hash of multiple items as hex
pub fn hash_all_hex(items: &[&[u8]]) -> String {
    hex::encode(hash_all(items))
}
