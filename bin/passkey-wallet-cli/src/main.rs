mod command;
mod config;
mod error;
mod logging;

use std::path::PathBuf;

use clap::Parser;
use command::Command;
use config::Config;
use passkey_wallet_client::{stamper::ApiPrivateKey, Config as ClientConfig};
use tracing::info;

#[derive(Parser)] // No Debug, holds the API private key
pub struct Cli {
    /// Path to the CLI config file
    pub config: PathBuf,

    /// Hex encoded API private key. Overrides the key file in the client
    /// config.
    #[clap(long, env = "PASSKEY_WALLET_API_PRIVATE_KEY", hide_env_values = true)]
    pub api_private_key: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[tokio::main]
pub async fn main() {
    if let Err(e) = run_main().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

pub async fn run_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    let _log_guards = logging::init(&config.logging)?;

    let api_private_key = cli
        .api_private_key
        .as_deref()
        .map(str::parse::<ApiPrivateKey>)
        .transpose()?;
    let client_config = ClientConfig::from_file(&config.client, api_private_key)?;

    info!("Starting passkey wallet CLI");
    info!("Logging config settings: {:?}", config.logging);

    command::run(cli.command, &config, client_config).await
}
