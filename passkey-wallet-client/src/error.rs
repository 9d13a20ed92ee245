use crate::chain::ChainRpcError;
use passkey_wallet::{
    types::{
        activity::{ActivityStatus, TerminalFailureKind},
        ActivityId,
    },
    PasskeyWalletError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasskeyWalletClientError {
    #[error("Network error talking to the custody service: {0}")]
    TransientNetwork(#[source] reqwest::Error),
    #[error("Activity {activity_id} ended with {kind} (attempt {attempt})")]
    ActivityTerminalFailure {
        kind: TerminalFailureKind,
        activity_id: ActivityId,
        attempt: u32,
    },
    #[error("Activity {activity_id} still {last_status} after {attempts} attempts")]
    Timeout {
        activity_id: ActivityId,
        last_status: ActivityStatus,
        attempts: u32,
    },
    #[error("Waiting for activity {activity_id} was cancelled before attempt {attempt}")]
    Cancelled { activity_id: ActivityId, attempt: u32 },
    #[error("Custody service returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Activity result failed validation: {0}")]
    Validation(String),
    #[error("Chain operation {operation} failed: {source}")]
    Chain {
        operation: &'static str,
        #[source]
        source: ChainRpcError,
    },

    // Setup errors
    #[error("API private key was not provided.")]
    PrivateKeyMissing,
    #[error("Invalid API private key: {0}")]
    InvalidPrivateKey(String),
    #[error("Warchest is not configured.")]
    WarchestNotConfigured,
    #[error("Wallet has no drops left.")]
    NoDropsLeft,
    #[error("API user script failed: {0}")]
    ApiUserScript(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Refusing to forward a request to {0}")]
    ForwardTargetRejected(String),

    // Wrapped errors
    #[error(transparent)]
    PasskeyWallet(#[from] PasskeyWalletError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl PasskeyWalletClientError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientNetwork(_) => true,
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Chain { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PasskeyWalletClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::TransientNetwork(error)
    }
}
