//! Forwards requests that a browser client already stamped. The body and
//! stamp are passed through untouched; the relay never signs anything.

use crate::{PasskeyWalletClientError, Result};
use passkey_wallet::{
    infrastructure::logging::abbreviate,
    types::stamp::{SignedRequest, Stamp},
};
use reqwest::{header::HeaderValue, Url};
use std::time::Duration;
use tracing::{debug, instrument};

pub const RELAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw answer of the custody service to a forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RelayResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct StampedRequestRelay {
    http: reqwest::Client,
}

impl StampedRequestRelay {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(RELAY_TIMEOUT).build()?,
        })
    }

    /// POST `body` to `url` verbatim with the stamp in the header its kind
    /// requires. Any HTTP status is returned to the caller as-is.
    #[instrument(skip_all, err(Debug), fields(url = %url))]
    pub async fn forward(&self, url: &str, body: &str, stamp: &Stamp) -> Result<RelayResponse> {
        let url = Url::parse(url)
            .map_err(|e| PasskeyWalletClientError::InvalidUrl(format!("{url}: {e}")))?;
        let header_name = stamp.kind()?.header_name();
        let header_value = HeaderValue::from_str(&stamp.stamp_header_value)?;

        let response = self
            .http
            .post(url)
            .header(header_name, header_value)
            .body(body.to_owned())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(
            "Forwarded request. status={} response={}",
            status,
            abbreviate(&String::from_utf8_lossy(&body))
        );

        Ok(RelayResponse { status, body })
    }

    pub async fn forward_request(&self, request: &SignedRequest) -> Result<RelayResponse> {
        self.forward(&request.url, &request.body, &request.stamp)
            .await
    }
}
