//! OpeniBank Subscriptions CLI
//!
//! Inspect the signing domain, derive keys, sign subscription permits and run
//! recurring-pull simulations against the in-memory ledger.
//!
//! # Quick Start
//!
//! ```bash
//! openibank-subs domain
//! openibank-subs keygen --label alice
//! openibank-subs sign-permit --label alice --spender 0x... --value 100 --interval 86400
//! openibank-subs simulate --days 10 --allowance 100 --pull 100
//! ```
//!
//! The signing domain is read from `OPENIBANK_*` environment variables; a
//! `.env` file in the working directory is loaded first.

use clap::{Parser, Subcommand};
use openibank_subscriptions::SubscriptionConfig;
use openibank_types::Address;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::{domain, keygen, permit, simulate};

const DAY: u64 = 86_400;

/// OpeniBank Subscriptions - recurring allowances with signed permits
#[derive(Parser)]
#[command(name = "openibank-subs")]
#[command(author = "OpeniBank Contributors")]
#[command(version)]
#[command(about = "Recurring subscription allowances for OpeniBank tokens", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Emit machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signing domain permits are verified under
    Domain,

    /// Derive or generate a signing key and its account address
    Keygen {
        /// Derive deterministically from a label instead of generating randomly
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Sign a subscription permit as the owner
    SignPermit {
        #[command(flatten)]
        signer: keygen::SignerArgs,

        /// Spender the allowance is granted to
        #[arg(long)]
        spender: Address,

        /// Quota per period, in token units
        #[arg(long)]
        value: u64,

        /// Period length in seconds
        #[arg(long, default_value_t = DAY)]
        interval: u64,

        /// Expiry as unix seconds (0 never expires)
        #[arg(long, default_value_t = 0)]
        expiry: u64,

        /// Owner nonce the permit is signed over
        #[arg(long, default_value_t = 0)]
        nonce: u64,

        /// Deadline as unix seconds (default: one hour from now)
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Simulate a subscription: daily pulls against a funded owner
    Simulate {
        /// Number of periods to run
        #[arg(short, long, default_value_t = 10)]
        days: u64,

        /// Quota per period
        #[arg(short, long, default_value_t = 100)]
        allowance: u64,

        /// Amount pulled each period
        #[arg(short, long, default_value_t = 100)]
        pull: u64,

        /// Owner's starting balance
        #[arg(short, long, default_value_t = 1_000)]
        funding: u64,

        /// Expire the agreement after this many periods (0 never expires)
        #[arg(short, long, default_value_t = 0)]
        expires_after: u64,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SubscriptionConfig::from_env();

    match cli.command {
        Commands::Domain => domain::show_domain(&config, cli.json)?,
        Commands::Keygen { label } => keygen::run_keygen(label.as_deref(), cli.json)?,
        Commands::SignPermit {
            signer,
            spender,
            value,
            interval,
            expiry,
            nonce,
            deadline,
        } => permit::sign_permit(
            &config,
            &signer,
            permit::PermitTerms {
                spender,
                value,
                interval,
                expiry,
                nonce,
                deadline,
            },
        )?,
        Commands::Simulate {
            days,
            allowance,
            pull,
            funding,
            expires_after,
        } => simulate::run_simulation(
            config,
            simulate::Scenario {
                periods: days,
                interval: DAY,
                allowance,
                pull,
                funding,
                expires_after,
            },
            cli.json,
        )?,
    }

    Ok(())
}
