//! Domain command - show the active signing domain

use openibank_subscriptions::SubscriptionConfig;

use crate::display;

pub fn show_domain(config: &SubscriptionConfig, json: bool) -> anyhow::Result<()> {
    let domain = config.signing_domain();
    let separator = domain.separator();

    if json {
        let out = serde_json::json!({
            "domain": domain,
            "symbol": config.symbol,
            "separator": separator,
            "prune_stale_periods": config.prune_stale_periods,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    display::section("Signing Domain");
    display::labeled("Name", &domain.name);
    display::labeled("Symbol", &config.symbol);
    display::labeled("Version", &domain.version);
    display::labeled("Chain ID", &domain.chain_id.to_string());
    display::labeled("Verifying contract", &domain.verifying_contract.to_string());
    display::labeled("Separator", &separator.to_string());
    println!();
    Ok(())
}
