//! Typed-data hashing for subscription permits
//!
//! Permits are hashed the EIP-712 way so that wallets can display and sign
//! them off-band:
//!
//! ```text
//! domainSeparator = keccak256(DOMAIN_TYPEHASH ‖ keccak256(name) ‖ keccak256(version) ‖ chainId ‖ verifyingContract)
//! structHash      = keccak256(PERMIT_TYPEHASH ‖ owner ‖ spender ‖ value ‖ interval ‖ expiry ‖ nonce ‖ deadline)
//! digest          = keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)
//! ```
//!
//! Every field is ABI-encoded as a 32-byte big-endian word.

use crate::{hash_all, keccak256, recover_signer, CryptoResult, KeyPair, RecoverableSignature};
use alloy_primitives::{B256, U256};
use openibank_types::{Address, Quota, UnixSeconds};
use serde::{Deserialize, Serialize};

/// Type string of the signing domain
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Type string of a subscription permit
pub const PERMIT_FOR_SUBSCRIPTION_TYPE: &str = "PermitForSubscription(address owner,address spender,uint256 value,uint256 interval,uint256 expiry,uint256 nonce,uint256 deadline)";

/// Parameters that separate one token's signatures from every other signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    /// Token name
    pub name: String,
    /// Signing domain version
    pub version: String,
    /// Chain the token lives on
    pub chain_id: u64,
    /// Address of the token itself
    pub verifying_contract: Address,
}

impl SigningDomain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// The domain separator, used as the opaque signing-domain identifier
    pub fn separator(&self) -> B256 {
        let type_hash = keccak256(EIP712_DOMAIN_TYPE.as_bytes());
        let name_hash = keccak256(self.name.as_bytes());
        let version_hash = keccak256(self.version.as_bytes());
        let chain_id = uint_word(self.chain_id);
        let contract = self.verifying_contract.into_word();

        B256::from(hash_all(&[
            &type_hash,
            &name_hash,
            &version_hash,
            chain_id.as_slice(),
            contract.as_slice(),
        ]))
    }

    /// Final digest a signer commits to for a given struct hash
    pub fn digest(&self, struct_hash: &B256) -> B256 {
        let separator = self.separator();
        B256::from(hash_all(&[
            &[0x19, 0x01],
            separator.as_slice(),
            struct_hash.as_slice(),
        ]))
    }
}

/// The canonical permit payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPermit {
    pub owner: Address,
    pub spender: Address,
    pub value: Quota,
    pub interval: u64,
    pub expiry: UnixSeconds,
    pub nonce: U256,
    pub deadline: UnixSeconds,
}

impl SubscriptionPermit {
    /// Hash of the permit fields under `PERMIT_FOR_SUBSCRIPTION_TYPE`
    pub fn struct_hash(&self) -> B256 {
        let type_hash = keccak256(PERMIT_FOR_SUBSCRIPTION_TYPE.as_bytes());
        B256::from(hash_all(&[
            &type_hash,
            self.owner.into_word().as_slice(),
            self.spender.into_word().as_slice(),
            B256::from(self.value.as_u256()).as_slice(),
            uint_word(self.interval).as_slice(),
            uint_word(self.expiry).as_slice(),
            B256::from(self.nonce).as_slice(),
            uint_word(self.deadline).as_slice(),
        ]))
    }

    /// Digest to sign or recover against
    pub fn signing_hash(&self, domain: &SigningDomain) -> B256 {
        domain.digest(&self.struct_hash())
    }

    /// Sign this permit with `keypair`
    pub fn sign(&self, domain: &SigningDomain, keypair: &KeyPair) -> CryptoResult<RecoverableSignature> {
        keypair.sign_hash(&self.signing_hash(domain).0)
    }

    /// Recover the account that signed this exact permit.
    ///
    /// Pure: comparing the result against the claimed owner is the caller's job.
    pub fn recover_signer(
        &self,
        domain: &SigningDomain,
        signature: &RecoverableSignature,
    ) -> CryptoResult<Address> {
        recover_signer(&self.signing_hash(domain).0, signature)
    }
}

fn uint_word(value: u64) -> B256 {
    B256::from(U256::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> SigningDomain {
        SigningDomain::new("OpeniBank USD", "1", 1, Address::repeat_byte(0xcc))
    }

    fn permit(owner: Address) -> SubscriptionPermit {
        SubscriptionPermit {
            owner,
            spender: Address::repeat_byte(0x22),
            value: Quota::from_units(100),
            interval: 86_400,
            expiry: 0,
            nonce: U256::ZERO,
            deadline: 1_700_000_000,
        }
    }

    #[test]
    fn test_type_hashes_match_known_values() {
        // keccak256 of the canonical EIP-712 domain type string
        assert_eq!(
            hex::encode(keccak256(EIP712_DOMAIN_TYPE.as_bytes())),
            "8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f"
        );
    }

    #[test]
    fn test_hashes_match_reference_vectors() {
        // Independently computed keccak256 over the ABI-encoded words
        let domain = domain();
        assert_eq!(
            hex::encode(domain.separator()),
            "ec8fd717d3e728ff7f7677c7ba0692360ec12ed2b545570d31d818bacbbff83a"
        );

        let permit = permit(Address::repeat_byte(0x11));
        assert_eq!(
            hex::encode(permit.struct_hash()),
            "595665db5f436182a90b7c067b8b1a29e2c93bd14a9fae75936a169ab44a5c47"
        );
        assert_eq!(
            hex::encode(permit.signing_hash(&domain)),
            "4090932e546497f36acae58b74634d45c7364b51f3c6ec8129ce278aa9eb5625"
        );
    }

    #[test]
    fn test_separator_depends_on_every_field() {
        let base = domain().separator();

        let mut other = domain();
        other.chain_id = 5;
        assert_ne!(base, other.separator());

        let mut other = domain();
        other.verifying_contract = Address::repeat_byte(0xdd);
        assert_ne!(base, other.separator());

        let mut other = domain();
        other.version = "2".to_string();
        assert_ne!(base, other.separator());
    }

    #[test]
    fn test_sign_and_recover_permit() {
        let keypair = KeyPair::generate();
        let permit = permit(keypair.address());
        let domain = domain();

        let signature = permit.sign(&domain, &keypair).unwrap();
        assert_eq!(permit.recover_signer(&domain, &signature).unwrap(), keypair.address());
    }

    #[test]
    fn test_nonce_is_bound_into_hash() {
        let keypair = KeyPair::generate();
        let domain = domain();
        let first = permit(keypair.address());
        let mut second = first.clone();
        second.nonce = U256::from(1u64);

        assert_ne!(first.signing_hash(&domain), second.signing_hash(&domain));

        let signature = first.sign(&domain, &keypair).unwrap();
        if let Ok(recovered) = second.recover_signer(&domain, &signature) {
            assert_ne!(recovered, keypair.address());
        }
    }

    #[test]
    fn test_signature_does_not_cross_domains() {
        let keypair = KeyPair::generate();
        let permit = permit(keypair.address());
        let signature = permit.sign(&domain(), &keypair).unwrap();

        let mut foreign = domain();
        foreign.chain_id = 137;
        if let Ok(recovered) = permit.recover_signer(&foreign, &signature) {
            assert_ne!(recovered, keypair.address());
        }
    }
}
