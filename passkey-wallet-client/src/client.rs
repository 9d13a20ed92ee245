//! Client object to interact with the custody service.

use crate::{
    config::Config,
    extractor::extract,
    poller::{wait_for_activity, ActivityStatusSource, CancelSignal, PollOptions},
    relay::StampedRequestRelay,
    stamper::Stamper,
    PasskeyWalletClientError, Result,
};
use async_trait::async_trait;
use passkey_wallet::{
    constants::{headers::X_STAMP, paths::GET_ACTIVITY},
    infrastructure::logging::record_field,
    types::{
        activity::{Activity, ActivityRequest, ActivityResponse, ActivityType, StatusOutcome},
        operations::{get_activity::request::GetActivityRequest, ActivityResult},
        ActivityId, OrganizationId,
    },
};
use reqwest::{header::HeaderValue, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A `CustodyClient` wraps the state needed to talk to the custody service on
/// behalf of the backend: its organization, its API key, and the HTTP
/// clients for its own requests and for relayed ones.
///
/// There is no global instance; construct one from [`Config`] and pass it to
/// whatever needs it. Clones share connection pools.
#[derive(Clone)]
pub struct CustodyClient {
    http: reqwest::Client,
    base_url: Url,
    organization_id: OrganizationId,
    stamper: Arc<dyn Stamper>,
    relay: StampedRequestRelay,
    poll_options: PollOptions,
    cancel: CancelSignal,
}

impl std::fmt::Debug for CustodyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodyClient")
            .field("base_url", &self.base_url.as_str())
            .field("organization_id", &self.organization_id)
            .field("public_key", &self.stamper.public_key())
            .field("poll_options", &self.poll_options)
            .finish()
    }
}

impl CustodyClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_stamper(config, Arc::new(config.api_key.clone()))
    }

    /// Use `stamper` in place of the API key from `config`.
    pub fn with_stamper(config: &Config, stamper: Arc<dyn Stamper>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()?,
            base_url: config.custody_base_url.clone(),
            organization_id: config.organization_id.clone(),
            stamper,
            relay: StampedRequestRelay::new()?,
            poll_options: config.polling,
            cancel: CancelSignal::never(),
        })
    }

    /// A clone whose activity waits stop when `cancel` fires.
    pub fn with_cancel_signal(&self, cancel: CancelSignal) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// A clone using different polling options.
    pub fn with_poll_options(&self, poll_options: PollOptions) -> Self {
        Self {
            poll_options,
            ..self.clone()
        }
    }

    /// The backend's own organization.
    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    /// Hex public key of the backend's API key.
    pub fn public_key(&self) -> &str {
        self.stamper.public_key()
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll_options
    }

    pub(crate) fn relay(&self) -> &StampedRequestRelay {
        &self.relay
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PasskeyWalletClientError::InvalidUrl(format!("{path}: {e}")))
    }

    /// POST `request` to `path`, stamped with the backend's API key. Anything
    /// but HTTP 200 is an error.
    async fn post_stamped(&self, path: &str, request: &impl Serialize) -> Result<Vec<u8>> {
        let body = serde_json::to_string(request)?;
        let stamp = self.stamper.stamp(body.as_bytes())?;

        let response = self
            .http
            .post(self.url(path)?)
            .header(X_STAMP, HeaderValue::from_str(&stamp.stamp_header_value)?)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        if status != 200 {
            return Err(PasskeyWalletClientError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }

    /// Run a read-only query.
    pub(crate) async fn query<Response: DeserializeOwned>(
        &self,
        path: &str,
        request: &impl Serialize,
    ) -> Result<Response> {
        let body = self.post_stamped(path, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Submit an activity and return it as first reported, which is usually
    /// not yet terminal.
    pub(crate) async fn submit_activity<P: Serialize>(
        &self,
        path: &str,
        activity_type: ActivityType,
        organization_id: &OrganizationId,
        parameters: P,
    ) -> Result<Activity> {
        let request = ActivityRequest::new(activity_type, organization_id.clone(), parameters);
        let response: ActivityResponse = self.query(path, &request).await?;

        record_field("activity_id", &response.activity.id);
        debug!("Submitted activity. status={}", response.activity.status);
        Ok(response.activity)
    }

    /// Wait for `activity` to finish, unless it already has.
    pub(crate) async fn wait_for_completion(&self, activity: Activity) -> Result<Activity> {
        match activity.status.outcome() {
            StatusOutcome::Completed => Ok(activity),
            StatusOutcome::Failed(kind) => Err(PasskeyWalletClientError::ActivityTerminalFailure {
                kind,
                activity_id: activity.id,
                attempt: 0,
            }),
            StatusOutcome::InProgress => {
                wait_for_activity(
                    self,
                    &activity.organization_id,
                    &activity.id,
                    self.poll_options,
                    self.cancel.clone(),
                )
                .await
            }
        }
    }

    /// Submit an activity, wait for it and decode its result.
    pub(crate) async fn submit_and_extract<P: Serialize, R: ActivityResult>(
        &self,
        path: &str,
        organization_id: &OrganizationId,
        parameters: P,
    ) -> Result<R> {
        let activity = self
            .submit_activity(path, R::activity_type(), organization_id, parameters)
            .await?;
        let activity = self.wait_for_completion(activity).await?;
        info!("Activity {} completed.", activity.id);
        extract(&activity)
    }
}

#[async_trait]
impl ActivityStatusSource for CustodyClient {
    async fn get_activity(
        &self,
        organization_id: &OrganizationId,
        activity_id: &ActivityId,
    ) -> Result<Activity> {
        let request = GetActivityRequest {
            activity_id: activity_id.clone(),
            organization_id: organization_id.clone(),
        };
        let response: ActivityResponse = self.query(GET_ACTIVITY, &request).await?;
        Ok(response.activity)
    }
}
