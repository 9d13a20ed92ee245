//! Stamping: signing a request body with the backend's API key so the custody
//! service can authenticate it.

use crate::{PasskeyWalletClientError, Result};
use base64::{engine::general_purpose, Engine};
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use passkey_wallet::types::stamp::{Stamp, StampKind};
use serde::Serialize;
use std::{path::Path, str::FromStr};
use zeroize::Zeroizing;

pub const API_KEY_SIGNATURE_SCHEME: &str = "SIGNATURE_SCHEME_TK_API_SECP256K1";

/// Hex encoded API private key, wiped from memory on drop.
#[derive(Clone)]
pub struct ApiPrivateKey(Zeroizing<String>);

impl ApiPrivateKey {
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = Zeroizing::new(std::fs::read_to_string(path)?);
        contents.parse()
    }
}

impl FromStr for ApiPrivateKey {
    type Err = PasskeyWalletClientError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(Zeroizing::new(s.trim().to_string())))
    }
}

impl std::fmt::Debug for ApiPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiPrivateKey(REDACTED)")
    }
}

/// Something that can authenticate a request body for the custody service.
pub trait Stamper: Send + Sync {
    fn stamp(&self, body: &[u8]) -> Result<Stamp>;

    /// Public key registered with the custody service, hex encoded.
    fn public_key(&self) -> &str;
}

/// Stamps requests with a secp256k1 API key.
#[derive(Clone)]
pub struct ApiKeyStamper {
    signing_key: SigningKey,
    public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyStamp<'a> {
    public_key: &'a str,
    signature: String,
    scheme: &'static str,
}

impl ApiKeyStamper {
    pub fn new(private_key: &ApiPrivateKey) -> Result<Self> {
        let key_bytes = Zeroizing::new(
            hex::decode(private_key.0.as_str())
                .map_err(|e| PasskeyWalletClientError::InvalidPrivateKey(e.to_string()))?,
        );
        let signing_key = SigningKey::from_slice(&key_bytes)
            .map_err(|e| PasskeyWalletClientError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = hex::encode(signing_key.verifying_key().to_encoded_point(true));
        Self {
            signing_key,
            public_key,
        }
    }
}

impl Stamper for ApiKeyStamper {
    /// ECDSA over SHA-256 of the exact body bytes, DER encoded.
    fn stamp(&self, body: &[u8]) -> Result<Stamp> {
        let signature: Signature = self.signing_key.sign(body);
        let stamp = ApiKeyStamp {
            public_key: &self.public_key,
            signature: hex::encode(signature.to_der()),
            scheme: API_KEY_SIGNATURE_SCHEME,
        };
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&stamp)?);

        Ok(Stamp::new(StampKind::ApiKey, encoded))
    }

    fn public_key(&self) -> &str {
        &self.public_key
    }
}

impl std::fmt::Debug for ApiKeyStamper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyStamper")
            .field("public_key", &self.public_key)
            .field("signing_key", &"REDACTED")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{signature::Verifier, VerifyingKey};
    use serde_json::Value;

    const TEST_PRIVATE_KEY: &str =
        "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";

    fn decode_stamp(stamp: &Stamp) -> Value {
        let json = general_purpose::URL_SAFE_NO_PAD
            .decode(&stamp.stamp_header_value)
            .unwrap();
        serde_json::from_slice(&json).unwrap()
    }

    #[test]
    fn stamp_verifies_against_public_key() {
        let stamper = ApiKeyStamper::new(&TEST_PRIVATE_KEY.parse().unwrap()).unwrap();
        let body = br#"{"organizationId":"org-1"}"#;

        let stamp = stamper.stamp(body).unwrap();
        assert_eq!(stamp.kind().unwrap(), StampKind::ApiKey);

        let decoded = decode_stamp(&stamp);
        assert_eq!(decoded["scheme"], API_KEY_SIGNATURE_SCHEME);
        assert_eq!(decoded["publicKey"], stamper.public_key());

        let public_key = hex::decode(decoded["publicKey"].as_str().unwrap()).unwrap();
        let verifying_key = VerifyingKey::from_sec1_bytes(&public_key).unwrap();
        let der = hex::decode(decoded["signature"].as_str().unwrap()).unwrap();
        let signature = Signature::from_der(&der).unwrap();
        assert!(verifying_key.verify(body, &signature).is_ok());
        assert!(verifying_key.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn public_key_is_compressed() {
        let stamper = ApiKeyStamper::new(&TEST_PRIVATE_KEY.parse().unwrap()).unwrap();
        assert_eq!(stamper.public_key().len(), 66);
        assert!(stamper.public_key().starts_with("02") || stamper.public_key().starts_with("03"));
    }

    #[test]
    fn bad_keys_are_rejected() {
        let short: ApiPrivateKey = "abcd".parse().unwrap();
        assert!(matches!(
            ApiKeyStamper::new(&short),
            Err(PasskeyWalletClientError::InvalidPrivateKey(_))
        ));
        let not_hex: ApiPrivateKey = "zz".parse().unwrap();
        assert!(ApiKeyStamper::new(&not_hex).is_err());
    }

    #[test]
    fn private_key_is_not_printed() {
        let key: ApiPrivateKey = TEST_PRIVATE_KEY.parse().unwrap();
        assert!(!format!("{key:?}").contains(TEST_PRIVATE_KEY));
    }
}
