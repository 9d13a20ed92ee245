use passkey_wallet::PasskeyWalletError;
use passkey_wallet_client::PasskeyWalletClientError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid log file path: {0:?}")]
    InvalidLogFilePath(PathBuf),
    #[error("Could not read {1:?}: {0}")]
    FileIo(#[source] std::io::Error, PathBuf),
    #[error("Logging is already initialized: {0}")]
    LoggingInit(#[from] tracing_subscriber::util::TryInitError),

    // Wrapped errors
    #[error(transparent)]
    Client(#[from] PasskeyWalletClientError),
    #[error(transparent)]
    PasskeyWallet(#[from] PasskeyWalletError),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}
