//! Key management for OpeniBank
//!
//! Owners sign permits with secp256k1 keys. An account's address is the last
//! 20 bytes of the Keccak-256 hash of its uncompressed public key (without the
//! `0x04` prefix byte), so a recovered public key maps to exactly one account.

use crate::{keccak256, CryptoError, CryptoResult, RecoverableSignature};
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use openibank_types::Address;
use rand::rngs::OsRng;

/// A secp256k1 key pair for signing permits
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Create from existing secret key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> CryptoResult<Self> {
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Derive a deterministic key pair from a label.
    ///
    /// Stable across runs, intended for demos and simulations only.
    pub fn from_label(label: &str) -> CryptoResult<Self> {
        let seed = blake3::derive_key("openibank subscriptions demo key v1", label.as_bytes());
        Self::from_bytes(&seed)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_from_verifying_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The account address controlled by this key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the verifying key (public)
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Get the secret key bytes (for secure storage only!)
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Sign a 32-byte digest, producing a low-S recoverable signature
    pub fn sign_hash(&self, hash: &[u8; 32]) -> CryptoResult<RecoverableSignature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        // Flipping s to the lower half mirrors the point, so the parity flips too.
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            v: 27 + recovery_id.to_byte(),
        })
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Derive the account address of a secp256k1 public key
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    // bytes[0] == 0x04 (uncompressed prefix), skip it
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.address(), b.address());
        assert!(!a.address().is_zero());
    }

    #[test]
    fn test_keypair_from_bytes() {
        let keypair1 = KeyPair::generate();
        let bytes = keypair1.secret_bytes();
        let keypair2 = KeyPair::from_bytes(&bytes).unwrap();

        assert_eq!(keypair1.address(), keypair2.address());
    }

    #[test]
    fn test_known_address() {
        // Secret key 1 is the generator point; its address is well known.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let keypair = KeyPair::from_bytes(&secret).unwrap();
        assert_eq!(
            keypair.address().to_string().to_lowercase(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(KeyPair::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_labels_are_deterministic() {
        let a = KeyPair::from_label("alice").unwrap();
        let again = KeyPair::from_label("alice").unwrap();
        let bob = KeyPair::from_label("bob").unwrap();
        assert_eq!(a.address(), again.address());
        assert_ne!(a.address(), bob.address());
    }
}
