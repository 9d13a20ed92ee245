use crate::{
    extractor::extract, relay::RelayResponse, CustodyClient, PasskeyWalletClientError, Result,
    TransactionBuilder,
};
use passkey_wallet::{
    constants::RECOVERY_CREDENTIAL_ROTATED_MESSAGE,
    infrastructure::logging::record_field,
    types::{
        activity::{Activity, ActivityResponse, ActivityType},
        operations::{
            export_wallet::result::ExportWalletResult, recover_user::result::RecoverUserResult,
            sign_transaction::result::SignTransactionResult,
        },
        stamp::SignedRequest,
    },
};
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

/// How a forwarded activity ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    Completed(Activity),
    /// A `RECOVER_USER` activity succeeded and removed the temporary
    /// credential that stamped it, so the custody service answered 401.
    /// There is no activity to read.
    CompletedCredentialRotated,
}

impl ForwardOutcome {
    pub fn into_activity(self) -> Option<Activity> {
        match self {
            Self::Completed(activity) => Some(activity),
            Self::CompletedCredentialRotated => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Recovered(RecoverUserResult),
    /// Recovery went through; the custody service no longer accepts the
    /// credential that requested it.
    CredentialRotated,
}

/// Only the activity type of a forwarded body is looked at.
#[derive(Deserialize)]
struct ForwardedBody {
    #[serde(rename = "type")]
    activity_type: Option<ActivityType>,
}

fn forwarded_activity_type(body: &str) -> Option<ActivityType> {
    serde_json::from_str::<ForwardedBody>(body)
        .ok()
        .and_then(|body| body.activity_type)
}

fn credential_rotated(response: &RelayResponse) -> bool {
    response.status == 401 && response.body_text().contains(RECOVERY_CREDENTIAL_ROTATED_MESSAGE)
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

impl CustodyClient {
    /// Stamped requests may only go to the custody service itself.
    pub(crate) fn check_forward_target(&self, url: &str) -> Result<()> {
        let target = Url::parse(url)
            .map_err(|e| PasskeyWalletClientError::InvalidUrl(format!("{url}: {e}")))?;
        if !same_origin(&target, self.base_url()) {
            return Err(PasskeyWalletClientError::ForwardTargetRejected(
                url.to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) async fn handle_forward_signed_activity(
        &self,
        request: &SignedRequest,
    ) -> Result<ForwardOutcome> {
        info!("Starting forwarded activity");
        self.check_forward_target(&request.url)?;
        let activity_type = forwarded_activity_type(&request.body);

        let response = self.relay().forward_request(request).await?;

        if activity_type == Some(ActivityType::RecoverUser) && credential_rotated(&response) {
            info!("Recovery rotated the requesting credential");
            return Ok(ForwardOutcome::CompletedCredentialRotated);
        }
        if !response.is_success() {
            return Err(PasskeyWalletClientError::UnexpectedStatus {
                status: response.status,
                body: response.body_text(),
            });
        }

        let ActivityResponse { activity } = serde_json::from_slice(&response.body)?;
        record_field("activity_id", &activity.id);
        if let Some(expected) = activity_type {
            if activity.activity_type != expected {
                warn!(
                    "Forwarded {} but the custody service reported {}",
                    expected, activity.activity_type
                );
            }
        }

        let activity = self.wait_for_completion(activity).await?;
        Ok(ForwardOutcome::Completed(activity))
    }

    /// Forward and require a completed activity.
    async fn forward_completed(&self, request: &SignedRequest) -> Result<Activity> {
        self.handle_forward_signed_activity(request)
            .await?
            .into_activity()
            .ok_or_else(|| {
                PasskeyWalletClientError::Validation(
                    "forwarded activity returned no activity".to_string(),
                )
            })
    }

    pub(crate) async fn handle_export_wallet(
        &self,
        request: &SignedRequest,
    ) -> Result<ExportWalletResult> {
        let activity = self.forward_completed(request).await?;
        extract(&activity)
    }

    pub(crate) async fn handle_recover_user(
        &self,
        request: &SignedRequest,
    ) -> Result<RecoveryOutcome> {
        match self.handle_forward_signed_activity(request).await? {
            ForwardOutcome::Completed(activity) => {
                Ok(RecoveryOutcome::Recovered(extract(&activity)?))
            }
            ForwardOutcome::CompletedCredentialRotated => Ok(RecoveryOutcome::CredentialRotated),
        }
    }

    pub(crate) async fn handle_send_signed_transaction(
        &self,
        request: &SignedRequest,
        builder: &TransactionBuilder,
    ) -> Result<String> {
        let activity = self.forward_completed(request).await?;
        let result: SignTransactionResult = extract(&activity)?;
        builder
            .broadcast_transaction(&result.signed_transaction)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::tests::FakeChain,
        client::tests::{activity_json, mount_activity_statuses, test_client},
        transaction_builder::tests::{builder, gwei, sign},
    };
    use k256::ecdsa::SigningKey;
    use passkey_wallet::{
        constants::paths::GET_ACTIVITY,
        transaction::{address_from_verifying_key, parse_address},
        types::stamp::{Stamp, StampKind},
        U256,
    };
    use rand::rngs::OsRng;
    use serde_json::{json, Value};
    use wiremock::{
        matchers::{body_string, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const RECOVER_PATH: &str = "/public/v1/submit/recover_user";
    const EXPORT_PATH: &str = "/public/v1/submit/export_wallet";
    const SIGN_PATH: &str = "/public/v1/submit/sign_transaction";

    fn signed_request(server: &MockServer, submit_path: &str, activity_type: &str) -> SignedRequest {
        SignedRequest {
            url: format!("{}{}", server.uri(), submit_path),
            body: json!({
                "type": activity_type,
                "organizationId": "sub-alice",
                "timestampMs": "1700000000000",
                "parameters": {}
            })
            .to_string(),
            stamp: Stamp::new(StampKind::WebAuthn, "passkey-stamp"),
        }
    }

    async fn mount_forward(server: &MockServer, submit_path: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(submit_path))
            .and(header("X-Stamp-WebAuthn", "passkey-stamp"))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    fn completed(activity_type: &str, result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(activity_json(
            "act-user",
            "sub-alice",
            activity_type,
            "ACTIVITY_STATUS_COMPLETED",
            Some(result),
        ))
    }

    #[tokio::test]
    async fn body_is_forwarded_verbatim() {
        let server = MockServer::start().await;
        let request = signed_request(&server, EXPORT_PATH, "ACTIVITY_TYPE_EXPORT_WALLET");
        Mock::given(method("POST"))
            .and(body_string(request.body.clone()))
            .respond_with(completed(
                "ACTIVITY_TYPE_EXPORT_WALLET",
                json!({ "exportWalletResult": { "exportBundle": "bundle" } }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = test_client(&server)
            .forward_signed_activity(&request)
            .await
            .unwrap();
        assert!(matches!(outcome, ForwardOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn export_returns_bundle() {
        let server = MockServer::start().await;
        mount_forward(
            &server,
            EXPORT_PATH,
            completed(
                "ACTIVITY_TYPE_EXPORT_WALLET",
                json!({ "exportWalletResult": { "walletId": "wallet-alice", "exportBundle": "bundle" } }),
            ),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, EXPORT_PATH, "ACTIVITY_TYPE_EXPORT_WALLET");
        let result = client.export_wallet(&request).await.unwrap();
        assert_eq!(result.export_bundle, "bundle");
    }

    #[tokio::test]
    async fn pending_activity_is_polled_with_backend_key() {
        let server = MockServer::start().await;
        mount_forward(
            &server,
            EXPORT_PATH,
            ResponseTemplate::new(200).set_body_json(activity_json(
                "act-user",
                "sub-alice",
                "ACTIVITY_TYPE_EXPORT_WALLET",
                "ACTIVITY_STATUS_PENDING",
                None,
            )),
        )
        .await;
        mount_activity_statuses(
            &server,
            "act-user",
            "sub-alice",
            "ACTIVITY_TYPE_EXPORT_WALLET",
            &["ACTIVITY_STATUS_COMPLETED"],
            json!({ "exportWalletResult": { "exportBundle": "bundle" } }),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, EXPORT_PATH, "ACTIVITY_TYPE_EXPORT_WALLET");
        let result = client.export_wallet(&request).await.unwrap();
        assert_eq!(result.export_bundle, "bundle");

        let polls = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|request| request.url.path() == GET_ACTIVITY)
            .collect::<Vec<_>>();
        assert_eq!(polls.len(), 1);
        assert!(polls[0].headers.contains_key("X-Stamp"));
        assert!(!polls[0].headers.contains_key("X-Stamp-WebAuthn"));
    }

    #[tokio::test]
    async fn recovery_401_counts_as_success() {
        let server = MockServer::start().await;
        mount_forward(
            &server,
            RECOVER_PATH,
            ResponseTemplate::new(401).set_body_json(json!({
                "code": 16,
                "message": "no valid user found for authenticator",
            })),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, RECOVER_PATH, "ACTIVITY_TYPE_RECOVER_USER");
        let outcome = client.recover_user(&request).await.unwrap();
        assert_eq!(outcome, RecoveryOutcome::CredentialRotated);
    }

    #[tokio::test]
    async fn recovery_returns_new_authenticator() {
        let server = MockServer::start().await;
        mount_forward(
            &server,
            RECOVER_PATH,
            completed(
                "ACTIVITY_TYPE_RECOVER_USER",
                json!({ "recoverUserResult": { "authenticatorId": ["auth-1"] } }),
            ),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, RECOVER_PATH, "ACTIVITY_TYPE_RECOVER_USER");
        match client.recover_user(&request).await.unwrap() {
            RecoveryOutcome::Recovered(result) => {
                assert_eq!(result.authenticator_id[0].as_str(), "auth-1")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_401_for_other_activities_is_an_error() {
        let server = MockServer::start().await;
        mount_forward(
            &server,
            EXPORT_PATH,
            ResponseTemplate::new(401).set_body_string("no valid user found for authenticator"),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, EXPORT_PATH, "ACTIVITY_TYPE_EXPORT_WALLET");
        assert!(matches!(
            client.forward_signed_activity(&request).await,
            Err(PasskeyWalletClientError::UnexpectedStatus { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn other_recovery_401_is_an_error() {
        let server = MockServer::start().await;
        mount_forward(
            &server,
            RECOVER_PATH,
            ResponseTemplate::new(401).set_body_string("stamp expired"),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, RECOVER_PATH, "ACTIVITY_TYPE_RECOVER_USER");
        assert!(matches!(
            client.recover_user(&request).await,
            Err(PasskeyWalletClientError::UnexpectedStatus { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn foreign_hosts_are_not_forwarded_to() {
        let server = MockServer::start().await;
        let elsewhere = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&elsewhere)
            .await;

        let client = test_client(&server);
        let request = signed_request(&elsewhere, EXPORT_PATH, "ACTIVITY_TYPE_EXPORT_WALLET");
        assert!(matches!(
            client.forward_signed_activity(&request).await,
            Err(PasskeyWalletClientError::ForwardTargetRejected(_))
        ));
    }

    #[tokio::test]
    async fn signed_transaction_is_broadcast() {
        let key = SigningKey::random(&mut OsRng);
        let sender = address_from_verifying_key(key.verifying_key());
        let (builder, chain) = builder(FakeChain::with_fees(gwei(10), gwei(1)));
        let payload = builder
            .construct_transfer(
                sender,
                parse_address("0x5dc4a8ec5e0b1b6ba1a09e4fbe5ac9bd0c21ef4d").unwrap(),
                U256::from(1_000u64),
                None,
            )
            .await
            .unwrap();
        let signed = sign(&payload, &key);

        let server = MockServer::start().await;
        mount_forward(
            &server,
            SIGN_PATH,
            completed(
                "ACTIVITY_TYPE_SIGN_TRANSACTION_V2",
                json!({ "signTransactionResult": { "signedTransaction": signed } }),
            ),
        )
        .await;

        let client = test_client(&server);
        let request = signed_request(&server, SIGN_PATH, "ACTIVITY_TYPE_SIGN_TRANSACTION_V2");
        let hash = client
            .send_signed_transaction(&request, &builder)
            .await
            .unwrap();

        assert!(hash.starts_with("0x"));
        assert_eq!(chain.broadcasts.lock().unwrap().len(), 1);
    }
}
