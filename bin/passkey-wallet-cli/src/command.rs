//! Operator subcommands.

use crate::{config::Config, error::CliError};
use anyhow::Context;
use clap::Subcommand;
use passkey_wallet::{
    transaction::{format_address, parse_address},
    types::{sub_organization::Attestation, OrganizationId, WalletId},
    units::{format_ether, parse_ether},
};
use passkey_wallet_client::{
    api::{ActivityApiUserCreator, ApiUserCreator, ScriptApiUserCreator},
    warchest::{drops_left, Warchest},
    Config as ClientConfig, CustodyClient, TransactionBuilder,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the backend API key is accepted by the custody service
    Whoami,
    /// Create a sub-organization and wallet for a new user
    Provision {
        #[clap(long)]
        email: String,
        /// JSON file with the passkey attestation
        #[clap(long)]
        attestation: PathBuf,
        #[clap(long)]
        challenge: String,
    },
    /// Send a drop from the warchest
    Drop {
        /// Recipient address
        to: String,
        /// Drops the recipient already received
        #[clap(long, default_value_t = 0)]
        used: u8,
    },
    /// Replace a stuck warchest transaction with a zero-value self transfer
    OverrideNonce { nonce: u64 },
    /// Print the signing payload of a transfer
    ConstructTransfer {
        #[clap(long)]
        from: String,
        #[clap(long)]
        to: String,
        /// Amount in ether, e.g. 0.05
        #[clap(long)]
        amount: String,
        #[clap(long)]
        nonce: Option<u64>,
    },
    /// Broadcast a hex encoded signed transaction
    Broadcast { signed_transaction: String },
    /// Print the balance of an address, or of the warchest
    Balance { address: Option<String> },
    /// Print the address of a single-account wallet
    WalletAddress {
        organization_id: String,
        wallet_id: String,
    },
    /// Create an API-only user
    CreateApiUser {
        #[clap(long)]
        organization_id: String,
        #[clap(long)]
        user_name: String,
        #[clap(long)]
        public_key: String,
        /// Use the configured script instead of a typed submission
        #[clap(long)]
        script: bool,
    },
}

struct App {
    client: CustodyClient,
    builder: TransactionBuilder,
    client_config: ClientConfig,
    api_user_script: Option<PathBuf>,
}

impl App {
    fn new(config: &Config, client_config: ClientConfig) -> Result<Self, CliError> {
        Ok(Self {
            client: CustodyClient::new(&client_config)?,
            builder: TransactionBuilder::from_config(
                &client_config.chain,
                client_config.request_timeout,
            )?,
            api_user_script: config.api_user_script.clone(),
            client_config,
        })
    }

    fn warchest(&self) -> Result<Warchest, CliError> {
        Ok(Warchest::from_config(
            self.client_config.warchest.clone(),
            self.client.clone(),
            self.builder.clone(),
        )?)
    }
}

pub async fn run(command: Command, config: &Config, client_config: ClientConfig) -> anyhow::Result<()> {
    let app = App::new(config, client_config)?;

    match command {
        Command::Whoami => {
            let whoami = app.client.whoami().await?;
            println!(
                "{} ({}) in {} ({})",
                whoami.username, whoami.user_id, whoami.organization_name, whoami.organization_id
            );
        }
        Command::Provision {
            email,
            attestation,
            challenge,
        } => {
            let attestation_json = std::fs::read_to_string(&attestation)
                .with_context(|| format!("reading {}", attestation.display()))?;
            let attestation: Attestation = serde_json::from_str(&attestation_json)?;
            let sub_organization = app
                .client
                .create_user_sub_organization(&email, attestation, &challenge)
                .await?;
            println!("{}", serde_json::to_string_pretty(&sub_organization)?);
        }
        Command::Drop { to, used } => {
            let to = parse_address(&to)?;
            let hash = app.warchest()?.drop_to(to, used).await?;
            println!("{hash}");
            info!("{} drops left for {}", drops_left(used.saturating_add(1)), format_address(&to));
        }
        Command::OverrideNonce { nonce } => {
            let hash = app.warchest()?.override_nonce(nonce).await?;
            println!("{hash}");
        }
        Command::ConstructTransfer {
            from,
            to,
            amount,
            nonce,
        } => {
            let payload = app
                .builder
                .construct_transfer(parse_address(&from)?, parse_address(&to)?, parse_ether(&amount)?, nonce)
                .await?;
            println!("{payload}");
        }
        Command::Broadcast { signed_transaction } => {
            let hash = app.builder.broadcast_transaction(&signed_transaction).await?;
            println!("{hash}");
        }
        Command::Balance { address } => {
            let address = match address {
                Some(address) => parse_address(&address)?,
                None => app.warchest()?.address(),
            };
            let balance = app.builder.balance(address).await?;
            println!("{} ETH", format_ether(balance));
        }
        Command::WalletAddress {
            organization_id,
            wallet_id,
        } => {
            let address = app
                .client
                .get_wallet_address(&OrganizationId::new(organization_id), &WalletId::new(wallet_id))
                .await?;
            println!("{}", format_address(&address));
        }
        Command::CreateApiUser {
            organization_id,
            user_name,
            public_key,
            script,
        } => {
            let creator: Box<dyn ApiUserCreator> = if script {
                let script = app
                    .api_user_script
                    .clone()
                    .context("no api_user_script in the CLI config")?;
                Box::new(ScriptApiUserCreator::new(app.client.clone(), script))
            } else {
                Box::new(ActivityApiUserCreator::new(app.client.clone()))
            };
            let user_id = creator
                .create_api_user(&OrganizationId::new(organization_id), &user_name, &public_key)
                .await?;
            println!("{user_id}");
        }
    }

    Ok(())
}
