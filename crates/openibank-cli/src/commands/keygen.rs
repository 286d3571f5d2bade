//! Keygen command - derive or generate owner keys

use anyhow::{anyhow, bail, Context};
use clap::Args;
use openibank_crypto::KeyPair;

use crate::display;

/// Where a signing key comes from
#[derive(Args, Debug)]
pub struct SignerArgs {
    /// Derive the owner key from a label
    #[arg(long, conflicts_with = "secret")]
    pub label: Option<String>,

    /// Owner secret key as 32 hex bytes
    #[arg(long)]
    pub secret: Option<String>,
}

impl SignerArgs {
    pub fn keypair(&self) -> anyhow::Result<KeyPair> {
        match (&self.label, &self.secret) {
            (Some(label), _) => Ok(KeyPair::from_label(label)?),
            (None, Some(secret)) => {
                let bytes = hex::decode(secret.trim_start_matches("0x"))
                    .context("secret key is not valid hex")?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| anyhow!("secret key must be 32 bytes"))?;
                Ok(KeyPair::from_bytes(&bytes)?)
            }
            (None, None) => bail!("either --label or --secret is required"),
        }
    }
}

pub fn run_keygen(label: Option<&str>, json: bool) -> anyhow::Result<()> {
    let keypair = match label {
        Some(label) => KeyPair::from_label(label)?,
        None => KeyPair::generate(),
    };
    let secret = format!("0x{}", hex::encode(keypair.secret_bytes()));

    if json {
        let out = serde_json::json!({
            "label": label,
            "address": keypair.address(),
            "secret": secret,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    display::section("Signing Key");
    if let Some(label) = label {
        display::labeled("Label", label);
    }
    display::labeled("Address", &keypair.address().to_string());
    display::labeled("Secret", &secret);
    display::info("Keep the secret out of shell history and logs");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_and_secret_resolve_to_same_key() {
        let from_label = SignerArgs {
            label: Some("alice".to_string()),
            secret: None,
        }
        .keypair()
        .unwrap();
        let from_secret = SignerArgs {
            label: None,
            secret: Some(format!("0x{}", hex::encode(from_label.secret_bytes()))),
        }
        .keypair()
        .unwrap();

        assert_eq!(from_label.address(), from_secret.address());
    }

    #[test]
    fn test_short_secret_rejected() {
        let args = SignerArgs {
            label: None,
            secret: Some("abcd".to_string()),
        };
        assert!(args.keypair().is_err());
    }
}
