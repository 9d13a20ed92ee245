use thiserror::Error;

use crate::U256;

#[derive(Debug, Error)]
pub enum PasskeyWalletError {
    // Transaction errors
    #[error("Cannot decode hex input: {0}")]
    Decode(#[from] hex::FromHexError),
    #[error("Cannot parse transaction bytes: {0}")]
    Parse(String),
    #[error("Unsupported transaction type: 0x{0:02x}")]
    UnsupportedTransactionType(u8),
    #[error("Fee cap {fee_cap} is below priority fee {tip}")]
    FeeCapBelowTip { fee_cap: U256, tip: U256 },
    #[error("Transaction signature is invalid")]
    InvalidSignature,

    // Input errors
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unknown stamp header: {0}")]
    UnknownStampHeader(String),
    #[error("Invalid activity status: {0}")]
    InvalidActivityStatus(String),

    // Wrapped errors
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<rlp::DecoderError> for PasskeyWalletError {
    fn from(error: rlp::DecoderError) -> Self {
        Self::Parse(error.to_string())
    }
}
