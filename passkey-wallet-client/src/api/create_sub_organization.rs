use crate::{CustodyClient, PasskeyWalletClientError, Result};
use passkey_wallet::{
    constants::paths::CREATE_SUB_ORGANIZATION,
    infrastructure::logging::record_field,
    types::{
        operations::create_sub_organization::{
            intent::CreateSubOrganizationIntent, result::CreateSubOrganizationResult,
        },
        sub_organization::{Attestation, SubOrganization},
    },
};
use tracing::info;

impl CustodyClient {
    pub(crate) async fn handle_create_user_sub_organization(
        &self,
        email: &str,
        attestation: Attestation,
        challenge: &str,
    ) -> Result<SubOrganization> {
        info!("Starting sub-organization provisioning");
        if email.trim().is_empty() {
            return Err(PasskeyWalletClientError::Validation(
                "email must not be empty".to_string(),
            ));
        }

        let intent =
            CreateSubOrganizationIntent::for_user(email, attestation, challenge, self.public_key());
        let parent = self.organization_id().clone();
        record_field("organization_id", &parent);

        let result: CreateSubOrganizationResult = self
            .submit_and_extract(CREATE_SUB_ORGANIZATION, &parent, intent)
            .await?;
        let sub_organization = result
            .into_sub_organization()
            .map_err(PasskeyWalletClientError::Validation)?;

        info!(
            "Provisioned sub-organization {} with wallet {}",
            sub_organization.sub_organization_id, sub_organization.signing_key_id
        );
        Ok(sub_organization)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::tests::{activity_json, mount_activity_statuses, test_client},
        PasskeyWalletClientError,
    };
    use passkey_wallet::{
        constants::paths::{CREATE_SUB_ORGANIZATION, GET_ACTIVITY},
        transaction::parse_address,
        types::sub_organization::Attestation,
    };
    use serde_json::{json, Value};
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const SUB_ORG_TYPE: &str = "ACTIVITY_TYPE_CREATE_SUB_ORGANIZATION_V4";

    fn attestation() -> Attestation {
        Attestation {
            credential_id: "cred".to_string(),
            client_data_json: "client-data".to_string(),
            attestation_object: "attestation".to_string(),
            transports: Vec::new(),
        }
    }

    async fn mount_submission(server: &MockServer, addresses: Value) {
        Mock::given(method("POST"))
            .and(path(CREATE_SUB_ORGANIZATION))
            .and(body_partial_json(json!({
                "type": SUB_ORG_TYPE,
                "organizationId": "org-backend",
                "parameters": {
                    "subOrganizationName": "Passkey Wallet for alice-at-example.com",
                    "rootQuorumThreshold": 1,
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json(
                "act-sub",
                "org-backend",
                SUB_ORG_TYPE,
                "ACTIVITY_STATUS_CREATED",
                None,
            )))
            .expect(1)
            .mount(server)
            .await;
        mount_activity_statuses(
            server,
            "act-sub",
            "org-backend",
            SUB_ORG_TYPE,
            &["ACTIVITY_STATUS_PENDING", "ACTIVITY_STATUS_COMPLETED"],
            json!({ "createSubOrganizationResultV4": {
                "subOrganizationId": "sub-alice",
                "wallet": { "walletId": "wallet-alice", "addresses": addresses }
            }}),
        )
        .await;
    }

    #[tokio::test]
    async fn provisioning_returns_identifiers_after_completion() {
        let server = MockServer::start().await;
        mount_submission(
            &server,
            json!(["0x08d2b0a37f869ff76bacb5bab3278e26ab7067b7"]),
        )
        .await;

        let client = test_client(&server);
        let sub_organization = client
            .create_user_sub_organization("alice@example.com", attestation(), "challenge")
            .await
            .unwrap();

        assert_eq!(sub_organization.sub_organization_id.as_str(), "sub-alice");
        assert_eq!(sub_organization.signing_key_id.as_str(), "wallet-alice");
        assert_eq!(
            sub_organization.derived_address,
            parse_address("0x08d2b0a37f869ff76bacb5bab3278e26ab7067b7").unwrap()
        );
    }

    #[tokio::test]
    async fn backend_key_is_a_root_user() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        Mock::given(method("POST"))
            .and(path(CREATE_SUB_ORGANIZATION))
            .and(body_partial_json(json!({
                "parameters": { "rootUsers": [
                    { "userEmail": "alice@example.com" },
                    { "apiKeys": [{ "publicKey": client.public_key() }] }
                ]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json(
                "act-sub",
                "org-backend",
                SUB_ORG_TYPE,
                "ACTIVITY_STATUS_COMPLETED",
                Some(json!({ "createSubOrganizationResultV4": {
                    "subOrganizationId": "sub-alice",
                    "wallet": {
                        "walletId": "wallet-alice",
                        "addresses": ["0x08d2b0a37f869ff76bacb5bab3278e26ab7067b7"]
                    }
                }})),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let sub_organization = client
            .create_user_sub_organization("alice@example.com", attestation(), "challenge")
            .await
            .unwrap();
        assert_eq!(sub_organization.sub_organization_id.as_str(), "sub-alice");
    }

    #[tokio::test]
    async fn wrong_address_count_returns_no_identifiers() {
        for addresses in [
            json!([]),
            json!([
                "0x08d2b0a37f869ff76bacb5bab3278e26ab7067b7",
                "0x5dc4a8ec5e0b1b6ba1a09e4fbe5ac9bd0c21ef4d"
            ]),
        ] {
            let server = MockServer::start().await;
            mount_submission(&server, addresses).await;

            let client = test_client(&server);
            let result = client
                .create_user_sub_organization("alice@example.com", attestation(), "challenge")
                .await;
            assert!(matches!(result, Err(PasskeyWalletClientError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn rejected_activity_is_a_terminal_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CREATE_SUB_ORGANIZATION))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json(
                "act-sub",
                "org-backend",
                SUB_ORG_TYPE,
                "ACTIVITY_STATUS_PENDING",
                None,
            )))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GET_ACTIVITY))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json(
                "act-sub",
                "org-backend",
                SUB_ORG_TYPE,
                "ACTIVITY_STATUS_REJECTED",
                None,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client
            .create_user_sub_organization("alice@example.com", attestation(), "challenge")
            .await;
        assert!(matches!(
            result,
            Err(PasskeyWalletClientError::ActivityTerminalFailure { attempt: 1, .. })
        ));
    }

    #[tokio::test]
    async fn empty_email_is_rejected_before_submitting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client
            .create_user_sub_organization("  ", attestation(), "challenge")
            .await;
        assert!(matches!(result, Err(PasskeyWalletClientError::Validation(_))));
    }
}
