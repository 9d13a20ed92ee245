//! Config for the operator CLI.

use crate::error::CliError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::Level;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct Config {
    /// Path to the passkey wallet client config.
    pub client: PathBuf,
    pub logging: LoggingConfig,
    /// Script used by `create-api-user --script`.
    #[serde(default)]
    pub api_user_script: Option<PathBuf>,
}

impl Config {
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self, CliError> {
        let config_string = std::fs::read_to_string(&config_path)
            .map_err(|e| CliError::FileIo(e, config_path.as_ref().to_path_buf()))?;
        let mut config = Self::from_str(&config_string)?;

        // Relative paths are relative to the config file.
        if let Some(dir) = config_path.as_ref().parent() {
            config.client = dir.join(&config.client);
            config.api_user_script = config.api_user_script.map(|script| dir.join(script));
        }
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = CliError;

    fn from_str(config_string: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(config_string)?)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct LoggingConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub stdout_log_level: Level,
    pub log_files: Option<LoggingFileConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct LoggingFileConfig {
    pub wallet_logs_file_name: PathBuf,
    pub all_logs_file_name: PathBuf,
}
