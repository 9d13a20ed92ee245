//! Stamps are client-produced signatures over a request body. They are
//! produced either by an API key or by a WebAuthn passkey and travel in a
//! header whose name depends on which.

use crate::{
    constants::headers::{X_STAMP, X_STAMP_WEBAUTHN},
    PasskeyWalletError,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StampKind {
    ApiKey,
    WebAuthn,
}

impl StampKind {
    pub fn header_name(self) -> &'static str {
        match self {
            Self::ApiKey => X_STAMP,
            Self::WebAuthn => X_STAMP_WEBAUTHN,
        }
    }
}

impl FromStr for StampKind {
    type Err = PasskeyWalletError;

    /// Header names are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(X_STAMP) {
            Ok(Self::ApiKey)
        } else if s.eq_ignore_ascii_case(X_STAMP_WEBAUTHN) {
            Ok(Self::WebAuthn)
        } else {
            Err(PasskeyWalletError::UnknownStampHeader(s.to_string()))
        }
    }
}

/// An opaque stamp and the header it must be sent under. The value is never
/// inspected or regenerated by this backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    pub stamp_header_name: String,
    pub stamp_header_value: String,
}

impl Stamp {
    pub fn new(kind: StampKind, value: impl Into<String>) -> Self {
        Self {
            stamp_header_name: kind.header_name().to_string(),
            stamp_header_value: value.into(),
        }
    }

    /// Validate the header name against the two stamp headers the custody
    /// service understands.
    pub fn kind(&self) -> Result<StampKind, PasskeyWalletError> {
        self.stamp_header_name.parse()
    }
}

/// A request signed by a browser client, to be forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRequest {
    pub url: String,
    /// Exact bytes that were stamped. Re-serializing would break the stamp.
    pub body: String,
    pub stamp: Stamp,
}
