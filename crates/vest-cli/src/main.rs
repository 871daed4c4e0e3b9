//! Vest CLI
//!
//! Generates delegated signing keys, registers them with a primary key's
//! signer proof and signs orders. JSON results go to stdout, logs to stderr.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Vest delegated signer tool.
#[derive(Parser, Debug)]
#[command(name = "vest-cli")]
#[command(about = "Register delegated signing keys and sign orders for Vest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a delegated signing key
    Keygen,

    /// Generate a delegated key and register it with a primary key's proof
    Register {
        /// File holding the primary private key as hex
        #[arg(long)]
        primary_key_file: PathBuf,

        /// Expected primary address; must match the key file
        #[arg(long)]
        primary_address: Option<String>,

        /// Configuration file (TOML, JSON or YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Network override: production or testnet
        #[arg(long)]
        network: Option<String>,

        /// Proof validity in days
        #[arg(long)]
        validity_days: Option<u32>,

        /// Print the request without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Sign an order with a delegated key
    SignOrder(commands::OrderArgs),

    /// Recover the signer of a digest
    Recover {
        /// 32-byte digest as hex
        #[arg(long)]
        digest: String,

        /// 65-byte signature as hex
        #[arg(long)]
        signature: String,

        /// Fail unless the signature recovers to this address
        #[arg(long)]
        expected: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vest_cli=info,vest_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Command::Keygen => commands::keygen()?,
        Command::Register {
            primary_key_file,
            primary_address,
            config,
            network,
            validity_days,
            dry_run,
        } => {
            commands::register(commands::RegisterArgs {
                primary_key_file,
                primary_address,
                config,
                network,
                validity_days,
                dry_run,
            })
            .await?
        }
        Command::SignOrder(args) => commands::sign_order(&args)?,
        Command::Recover {
            digest,
            signature,
            expected,
        } => commands::recover(&digest, &signature, expected.as_deref())?,
    };

    println!("{}", output.as_str());
    Ok(())
}
