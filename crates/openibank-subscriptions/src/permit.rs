//! Signed subscription permits
//!
//! A permit lets an owner authorize a spender off-band: the owner signs the
//! agreement terms together with their current nonce and a deadline, and
//! anyone may submit the signature.
//!
//! Verification is split in two:
//! - `PermitVerifier::verify` is pure. It checks the deadline, rebuilds the
//!   payload around the owner's current nonce, recovers the signer and compares
//!   it with the claimed owner.
//! - `PermitVerifier::apply` runs only after that succeeds. It consumes the
//!   nonce first and then installs the allowance.
//!
//! A stale nonce, a tampered field, a foreign key and a malformed signature
//! all surface as the same `InvalidSignature`.

use alloy_primitives::U256;
use openibank_crypto::{CryptoResult, KeyPair, RecoverableSignature, SigningDomain, SubscriptionPermit};
use openibank_types::{
    ensure_account, AccountRole, Address, AgreementKey, Quota, Result, SubscriptionError,
    UnixSeconds,
};
use serde::{Deserialize, Serialize};

use crate::{AllowanceLedger, SubscriptionState};

/// A permit as submitted for verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRequest {
    pub owner: Address,
    pub spender: Address,
    pub value: Quota,
    pub interval: u64,
    pub expiry: UnixSeconds,
    pub deadline: UnixSeconds,
    pub signature: RecoverableSignature,
}

impl PermitRequest {
    /// Sign a permit as `keypair` over `nonce`, the owner's current nonce.
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        keypair: &KeyPair,
        domain: &SigningDomain,
        spender: Address,
        value: Quota,
        interval: u64,
        expiry: UnixSeconds,
        nonce: U256,
        deadline: UnixSeconds,
    ) -> CryptoResult<Self> {
        let payload = SubscriptionPermit {
            owner: keypair.address(),
            spender,
            value,
            interval,
            expiry,
            nonce,
            deadline,
        };
        let signature = payload.sign(domain, keypair)?;

        Ok(Self {
            owner: keypair.address(),
            spender,
            value,
            interval,
            expiry,
            deadline,
            signature,
        })
    }

    /// The agreement this permit installs an allowance for
    pub fn key(&self) -> AgreementKey {
        AgreementKey::new(self.owner, self.spender, self.interval, self.expiry)
    }

    /// The canonical payload around a given nonce
    pub fn payload(&self, nonce: U256) -> SubscriptionPermit {
        SubscriptionPermit {
            owner: self.owner,
            spender: self.spender,
            value: self.value,
            interval: self.interval,
            expiry: self.expiry,
            nonce,
            deadline: self.deadline,
        }
    }
}

/// Verifies permits under one signing domain
#[derive(Debug, Clone)]
pub struct PermitVerifier {
    domain: SigningDomain,
}

impl PermitVerifier {
    pub fn new(domain: SigningDomain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// Check a permit against the owner's current nonce without side effects
    pub fn verify(&self, request: &PermitRequest, nonce: U256, now: UnixSeconds) -> Result<()> {
        if now > request.deadline {
            return Err(SubscriptionError::ExpiredDeadline {
                deadline: request.deadline,
                now,
            });
        }

        let recovered = request
            .payload(nonce)
            .recover_signer(&self.domain, &request.signature)
            .map_err(|e| {
                tracing::debug!(owner = %request.owner, error = %e, "Permit signature unreadable");
                SubscriptionError::InvalidSignature
            })?;

        if recovered != request.owner {
            return Err(SubscriptionError::InvalidSignature);
        }
        Ok(())
    }

    /// Verify, consume the owner's nonce, then install the allowance.
    ///
    /// Returns the nonce that was consumed. On any error `state` is untouched.
    pub fn apply(
        &self,
        state: &mut SubscriptionState,
        request: &PermitRequest,
        now: UnixSeconds,
    ) -> Result<U256> {
        let key = request.key();
        key.validate()?;
        ensure_account(&request.spender, AccountRole::Spender)?;

        let nonce = state.nonces.current(&request.owner);
        if let Err(e) = self.verify(request, nonce, now) {
            tracing::warn!(
                owner = %request.owner,
                spender = %request.spender,
                code = e.error_code(),
                "Permit rejected"
            );
            return Err(e);
        }

        let consumed = state.nonces.consume(&request.owner)?;
        state.book.set_allowance(&key, request.value);
        state.record_approval(&key, request.value);

        tracing::info!(
            owner = %request.owner,
            spender = %request.spender,
            nonce = %consumed,
            "Permit applied"
        );
        Ok(consumed)
    }
}
