//! Simulate command - run a recurring subscription on the in-memory ledger
//!
//! The owner authorizes the spender with a signed permit, then the clock is
//! advanced one period at a time and the spender pulls once per period.

use std::sync::Arc;

use colored::*;
use openibank_crypto::KeyPair;
use openibank_ledger::{FungibleLedger, InMemoryLedger};
use openibank_subscriptions::{
    Clock, ManualClock, PermitRequest, SubscriptionConfig, SubscriptionToken, SystemClock,
};
use openibank_types::{Quota, NEVER_EXPIRES};
use serde::Serialize;

use crate::display;

/// Parameters of one simulated subscription
pub struct Scenario {
    pub periods: u64,
    pub interval: u64,
    pub allowance: u64,
    pub pull: u64,
    pub funding: u64,
    pub expires_after: u64,
}

#[derive(Serialize)]
struct PullOutcome {
    period: u64,
    at: u64,
    settled: bool,
    error: Option<&'static str>,
    owner_balance: Quota,
    remaining: Quota,
}

pub fn run_simulation(config: SubscriptionConfig, scenario: Scenario, json: bool) -> anyhow::Result<()> {
    let ledger = InMemoryLedger::new();
    // Start at a period boundary so each advance lands in a fresh bucket.
    let start = SystemClock.now() / scenario.interval * scenario.interval;
    let clock = Arc::new(ManualClock::new(start));
    let token = SubscriptionToken::new(config, Arc::new(ledger.clone()), clock.clone());

    let owner = KeyPair::from_label("simulation-owner")?;
    let spender = KeyPair::from_label("simulation-spender")?.address();
    let merchant = KeyPair::from_label("simulation-merchant")?.address();
    ledger.mint(&owner.address(), Quota::from_units(scenario.funding))?;

    let expiry = match scenario.expires_after {
        0 => NEVER_EXPIRES,
        n => start.saturating_add(n.saturating_mul(scenario.interval)),
    };

    let permit = PermitRequest::sign(
        &owner,
        &token.config().signing_domain(),
        spender,
        Quota::from_units(scenario.allowance),
        scenario.interval,
        expiry,
        token.nonces(&owner.address()),
        start.saturating_add(scenario.interval),
    )?;
    token.permit_for_subscription(&permit)?;

    if !json {
        display::section("Subscription Simulation");
        display::labeled("Owner", &owner.address().to_string());
        display::labeled("Spender", &spender.to_string());
        display::labeled("Quota per period", &scenario.allowance.to_string());
        display::labeled(
            "Expiry",
            &if expiry == NEVER_EXPIRES {
                "never".to_string()
            } else {
                display::timestamp(expiry)
            },
        );
        display::success("Permit applied");
        println!();
    }

    let mut outcomes = Vec::new();
    for period in 1..=scenario.periods {
        let now = clock.advance(scenario.interval);
        let result = token.transfer_from_for_subscription(
            spender,
            owner.address(),
            merchant,
            Quota::from_units(scenario.pull),
            scenario.interval,
            expiry,
        );
        let outcome = PullOutcome {
            period,
            at: now,
            settled: result.is_ok(),
            error: result.as_ref().err().map(|e| e.error_code()),
            owner_balance: ledger.balance_of(&owner.address()),
            remaining: token.allowance_for_subscription(
                owner.address(),
                spender,
                scenario.interval,
                expiry,
            )?,
        };

        if !json {
            match &result {
                Ok(_) => display::success(&format!(
                    "{} pulled {} (balance {})",
                    display::timestamp(now),
                    scenario.pull,
                    outcome.owner_balance
                )),
                Err(e) => display::error(&format!("{} {}", display::timestamp(now), e)),
            }
        }
        outcomes.push(outcome);
    }

    let settled = outcomes.iter().filter(|o| o.settled).count();
    if json {
        let out = serde_json::json!({
            "owner": owner.address(),
            "spender": spender,
            "expiry": expiry,
            "nonce": token.nonces(&owner.address()),
            "pulls": outcomes,
            "events": token.events(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} {}/{} pulls settled, merchant received {}",
            "Summary:".bright_white().bold(),
            settled,
            scenario.periods,
            ledger.balance_of(&merchant).to_string().bright_green()
        );
        println!();
    }

    Ok(())
}
