//! Subscription token configuration

use openibank_crypto::SigningDomain;
use openibank_types::Address;
use serde::{Deserialize, Serialize};

/// Default token name used in the signing domain
pub const DEFAULT_TOKEN_NAME: &str = "OpeniBank USD";
/// Default token symbol
pub const DEFAULT_TOKEN_SYMBOL: &str = "IUSD";
/// Default signing domain version
pub const DEFAULT_DOMAIN_VERSION: &str = "1";
/// Default chain id
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Configuration for a subscription token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Token name (part of the signing domain)
    pub name: String,
    /// Token symbol (display only)
    pub symbol: String,
    /// Signing domain version
    pub version: String,
    /// Chain id bound into every permit signature
    pub chain_id: u64,
    /// Address identifying this token in the signing domain
    pub verifying_contract: Address,
    /// Drop spend buckets older than the current one when committing a spend
    pub prune_stale_periods: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            version: DEFAULT_DOMAIN_VERSION.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract: Address::ZERO,
            prune_stale_periods: false,
        }
    }
}

impl SubscriptionConfig {
    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// | Env var | Effect |
    /// |---|---|
    /// | `OPENIBANK_TOKEN_NAME` | Token name in the signing domain |
    /// | `OPENIBANK_TOKEN_SYMBOL` | Token symbol |
    /// | `OPENIBANK_DOMAIN_VERSION` | Signing domain version |
    /// | `OPENIBANK_CHAIN_ID` | Chain id |
    /// | `OPENIBANK_VERIFYING_CONTRACT` | Hex address of the token |
    /// | `OPENIBANK_PRUNE_STALE_PERIODS` | `true`/`1` to prune old buckets |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            name: std::env::var("OPENIBANK_TOKEN_NAME").unwrap_or(defaults.name),
            symbol: std::env::var("OPENIBANK_TOKEN_SYMBOL").unwrap_or(defaults.symbol),
            version: std::env::var("OPENIBANK_DOMAIN_VERSION").unwrap_or(defaults.version),
            chain_id: std::env::var("OPENIBANK_CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.chain_id),
            verifying_contract: std::env::var("OPENIBANK_VERIFYING_CONTRACT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.verifying_contract),
            prune_stale_periods: std::env::var("OPENIBANK_PRUNE_STALE_PERIODS")
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.prune_stale_periods),
        }
    }

    /// Create a config suitable for demos and tests.
    pub fn for_demo() -> Self {
        Self {
            verifying_contract: Address::repeat_byte(0x0b),
            ..Self::default()
        }
    }

    /// The signing domain permits are verified under
    pub fn signing_domain(&self) -> SigningDomain {
        SigningDomain::new(
            self.name.clone(),
            self.version.clone(),
            self.chain_id,
            self.verifying_contract,
        )
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubscriptionConfig::default();
        assert_eq!(config.name, DEFAULT_TOKEN_NAME);
        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
        assert!(!config.prune_stale_periods);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_signing_domain_follows_config() {
        let config = SubscriptionConfig::for_demo();
        let domain = config.signing_domain();
        assert_eq!(domain.name, config.name);
        assert_eq!(domain.verifying_contract, config.verifying_contract);

        let mut other = config.clone();
        other.chain_id = 10;
        assert_ne!(domain.separator(), other.signing_domain().separator());
    }
}
