use passkey_wallet::{
    constants::{DEFAULT_CUSTODY_API_HOST, SEPOLIA_CHAIN_ID},
    transaction::parse_address,
    types::OrganizationId,
    Address,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{
    poller::PollOptions,
    stamper::{ApiKeyStamper, ApiPrivateKey},
    PasskeyWalletClientError,
};

/// Client configuration with all fields ready to use.
#[derive(Clone)]
pub struct Config {
    pub custody_base_url: Url,
    pub organization_id: OrganizationId,
    pub api_key: ApiKeyStamper,
    pub request_timeout: Duration,
    pub polling: PollOptions,
    pub chain: ChainConfig,
    pub warchest: Option<WarchestConfig>,
}

impl Config {
    pub fn from_file(
        config_path: impl AsRef<Path>,
        api_private_key: Option<ApiPrivateKey>,
    ) -> Result<Self, PasskeyWalletClientError> {
        let config_string = std::fs::read_to_string(&config_path)?;
        let config_file = ConfigFile::from_str(&config_string)?;
        Self::from_config_file(config_file, api_private_key)
    }

    pub fn from_config_file(
        config: ConfigFile,
        api_private_key: Option<ApiPrivateKey>,
    ) -> Result<Self, PasskeyWalletClientError> {
        let private_key = if let Some(key) = api_private_key {
            key
        } else if let Some(key_path) = &config.api_private_key {
            ApiPrivateKey::read_from_file(key_path)?
        } else {
            return Err(PasskeyWalletClientError::PrivateKeyMissing);
        };

        Ok(Self {
            custody_base_url: custody_base_url(&config.custody_api_host)?,
            organization_id: config.organization_id,
            api_key: ApiKeyStamper::new(&private_key)?,
            request_timeout: config.request_timeout,
            polling: PollOptions::new(config.polling.max_attempts, config.polling.base_delay),
            chain: config.chain,
            warchest: config
                .warchest
                .map(WarchestConfig::try_from)
                .transpose()?,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("custody_base_url", &self.custody_base_url.as_str())
            .field("organization_id", &self.organization_id)
            .field("api_key", &self.api_key)
            .field("request_timeout", &self.request_timeout)
            .field("polling", &self.polling)
            .field("chain", &self.chain)
            .field("warchest", &self.warchest)
            .finish()
    }
}

/// The custody API is configured by host name. A full URL is accepted too so
/// the client can be pointed at a local mock.
fn custody_base_url(host: &str) -> Result<Url, PasskeyWalletClientError> {
    let url = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    Url::parse(&url).map_err(|e| PasskeyWalletClientError::InvalidUrl(format!("{url}: {e}")))
}

/// Client configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
#[non_exhaustive]
pub struct ConfigFile {
    #[serde(default = "default_custody_api_host")]
    pub custody_api_host: String,
    pub organization_id: OrganizationId,
    /// The API private key can be provided as a file or passed to the
    /// [`Config`] constructors.
    pub api_private_key: Option<PathBuf>,
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub polling: PollingConfig,
    pub chain: ChainConfig,
    pub warchest: Option<WarchestConfigFile>,
}

fn default_custody_api_host() -> String {
    DEFAULT_CUSTODY_API_HOST.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl FromStr for ConfigFile {
    type Err = PasskeyWalletClientError;

    fn from_str(config_string: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(config_string)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct PollingConfig {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let defaults = PollOptions::default();
        Self {
            max_attempts: defaults.max_attempts(),
            base_delay: defaults.base_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct ChainConfig {
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Retries for transient RPC failures. Broadcasts are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,
}

fn default_chain_id() -> u64 {
    SEPOLIA_CHAIN_ID
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

/// Operator-funded account used to seed new wallets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct WarchestConfigFile {
    pub organization_id: OrganizationId,
    /// Private key id or wallet account the custody service signs with.
    pub sign_with: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarchestConfig {
    pub organization_id: OrganizationId,
    pub sign_with: String,
    pub address: Address,
}

impl TryFrom<WarchestConfigFile> for WarchestConfig {
    type Error = PasskeyWalletClientError;

    fn try_from(config: WarchestConfigFile) -> Result<Self, Self::Error> {
        Ok(Self {
            address: parse_address(&config.address)?,
            organization_id: config.organization_id,
            sign_with: config.sign_with,
        })
    }
}
