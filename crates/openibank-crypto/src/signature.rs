//! Recoverable secp256k1 signatures for OpeniBank
//!
//! Signatures travel as 65 bytes `r || s || v` with `v` in `{27, 28}`
//! (`{0, 1}` is also accepted). High-S signatures are rejected so that a
//! valid signature cannot be re-shaped into a second valid one.

use crate::{address_from_verifying_key, CryptoError, CryptoResult};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use openibank_types::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of an encoded recoverable signature
pub const SIGNATURE_LENGTH: usize = 65;

/// A recoverable ECDSA signature
///
/// Serializes as its `0x`-prefixed hex wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature {
    /// Big-endian `r` component
    pub r: [u8; 32],
    /// Big-endian `s` component
    pub s: [u8; 32],
    /// Recovery byte
    pub v: u8,
}

impl RecoverableSignature {
    /// Parse from the 65-byte wire encoding
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(CryptoError::MalformedSignature(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_LENGTH,
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);

        Ok(Self { r, s, v: bytes[64] })
    }

    /// Parse from hex, with or without a `0x` prefix
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let encoded = encoded.strip_prefix("0x").unwrap_or(encoded);
        let bytes =
            hex::decode(encoded).map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The 65-byte wire encoding
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// `0x`-prefixed hex of the wire encoding
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    fn recovery_id(&self) -> CryptoResult<RecoveryId> {
        let byte = match self.v {
            27 | 28 => self.v - 27,
            0 | 1 => self.v,
            other => {
                return Err(CryptoError::MalformedSignature(format!(
                    "Invalid recovery byte {}",
                    other
                )))
            }
        };
        RecoveryId::from_byte(byte)
            .ok_or_else(|| CryptoError::MalformedSignature(format!("Invalid recovery byte {}", byte)))
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Recover the account that produced `signature` over the 32-byte `hash`.
///
/// Pure: this never consults or mutates any state.
pub fn recover_signer(hash: &[u8; 32], signature: &RecoverableSignature) -> CryptoResult<Address> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r);
    rs[32..].copy_from_slice(&signature.s);

    let parsed = Signature::from_slice(&rs)
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;

    if parsed.normalize_s().is_some() {
        return Err(CryptoError::MalformedSignature(
            "High-S signatures are not accepted".to_string(),
        ));
    }

    let recovery_id = signature.recovery_id()?;
    let key = VerifyingKey::recover_from_prehash(hash, &parsed, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;

    Ok(address_from_verifying_key(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keccak256, KeyPair};
    use alloy_primitives::U256;

    #[test]
    fn test_sign_and_recover() {
        let keypair = KeyPair::generate();
        let hash = keccak256(b"Hello, OpeniBank!");

        let signature = keypair.sign_hash(&hash).unwrap();
        assert!(signature.v == 27 || signature.v == 28);
        assert_eq!(recover_signer(&hash, &signature).unwrap(), keypair.address());
    }

    #[test]
    fn test_wrong_message_recovers_other_account() {
        let keypair = KeyPair::generate();
        let hash = keccak256(b"Hello, OpeniBank!");
        let wrong = keccak256(b"Hello, World!");

        let signature = keypair.sign_hash(&hash).unwrap();
        if let Ok(address) = recover_signer(&wrong, &signature) {
            assert_ne!(address, keypair.address());
        }
    }

    #[test]
    fn test_high_s_rejected() {
        let keypair = KeyPair::generate();
        let hash = keccak256(b"malleable");
        let signature = keypair.sign_hash(&hash).unwrap();

        // s' = n - s is the mirrored, equally valid ECDSA signature.
        let order = U256::from_str_radix(
            "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
            16,
        )
        .unwrap();
        let high_s = order - U256::from_be_bytes(signature.s);

        let mut malleable = signature;
        malleable.s = high_s.to_be_bytes::<32>();
        malleable.v = if signature.v == 27 { 28 } else { 27 };

        assert!(matches!(
            recover_signer(&hash, &malleable),
            Err(CryptoError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_bad_recovery_byte() {
        let keypair = KeyPair::generate();
        let hash = keccak256(b"v");
        let mut signature = keypair.sign_hash(&hash).unwrap();
        signature.v = 42;
        assert!(recover_signer(&hash, &signature).is_err());
    }

    #[test]
    fn test_wire_encoding() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign_hash(&keccak256(b"wire")).unwrap();

        let parsed = RecoverableSignature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(parsed, signature);

        assert!(RecoverableSignature::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_serde_as_hex() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign_hash(&keccak256(b"serde")).unwrap();

        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, format!("\"{}\"", signature.to_hex()));
        let parsed: RecoverableSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, signature);

        assert!(serde_json::from_str::<RecoverableSignature>("\"0x1234\"").is_err());
    }

    #[test]
    fn test_zero_signature_rejected() {
        let zero = RecoverableSignature { r: [0u8; 32], s: [0u8; 32], v: 27 };
        assert!(recover_signer(&[7u8; 32], &zero).is_err());
    }
}
