//! Sign-permit command - build a signed permit for off-band submission

use alloy_primitives::U256;
use openibank_subscriptions::{Clock, PermitRequest, SubscriptionConfig, SystemClock};
use openibank_types::{Address, Quota};

use super::keygen::SignerArgs;

/// Deadline applied when none is given
const DEFAULT_DEADLINE_SECS: u64 = 3_600;

/// Agreement terms to sign
pub struct PermitTerms {
    pub spender: Address,
    pub value: u64,
    pub interval: u64,
    pub expiry: u64,
    pub nonce: u64,
    pub deadline: Option<u64>,
}

/// Print the signed permit as JSON on stdout
pub fn sign_permit(
    config: &SubscriptionConfig,
    signer: &SignerArgs,
    terms: PermitTerms,
) -> anyhow::Result<()> {
    let keypair = signer.keypair()?;
    let deadline = terms
        .deadline
        .unwrap_or_else(|| SystemClock.now().saturating_add(DEFAULT_DEADLINE_SECS));

    let request = PermitRequest::sign(
        &keypair,
        &config.signing_domain(),
        terms.spender,
        Quota::from_units(terms.value),
        terms.interval,
        terms.expiry,
        U256::from(terms.nonce),
        deadline,
    )?;

    tracing::info!(owner = %request.owner, spender = %request.spender, deadline, "Permit signed");
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}
