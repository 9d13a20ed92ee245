use crate::{CustodyClient, PasskeyWalletClientError, Result};
use passkey_wallet::{
    constants::paths::{LIST_WALLET_ACCOUNTS, WHOAMI},
    types::{
        operations::{
            expect_count,
            list_wallet_accounts::{
                request::ListWalletAccountsRequest, response::ListWalletAccountsResponse,
            },
            whoami::{request::WhoamiRequest, response::WhoamiResponse},
        },
        stamp::SignedRequest,
        OrganizationId, WalletId,
    },
    Address,
};
use tracing::info;

impl CustodyClient {
    pub(crate) async fn handle_whoami(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<WhoamiResponse> {
        let request = WhoamiRequest {
            organization_id: organization_id.clone(),
        };
        let response: WhoamiResponse = self.query(WHOAMI, &request).await?;
        info!(
            "Custody API key belongs to user {} of {}",
            response.user_id, response.organization_name
        );
        Ok(response)
    }

    pub(crate) async fn handle_whoami_forwarded(
        &self,
        request: &SignedRequest,
    ) -> Result<WhoamiResponse> {
        self.check_forward_target(&request.url)?;
        let response = self.relay().forward_request(request).await?;
        if !response.is_success() {
            return Err(PasskeyWalletClientError::UnexpectedStatus {
                status: response.status,
                body: response.body_text(),
            });
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub(crate) async fn handle_get_wallet_address(
        &self,
        organization_id: &OrganizationId,
        wallet_id: &WalletId,
    ) -> Result<Address> {
        let request = ListWalletAccountsRequest {
            organization_id: organization_id.clone(),
            wallet_id: wallet_id.clone(),
        };
        let response: ListWalletAccountsResponse =
            self.query(LIST_WALLET_ACCOUNTS, &request).await?;

        expect_count("wallet accounts", &response.accounts, 1)
            .map_err(PasskeyWalletClientError::Validation)?;
        Ok(response.accounts[0].address)
    }
}

#[cfg(test)]
mod tests {
    use crate::{client::tests::test_client, PasskeyWalletClientError};
    use passkey_wallet::{
        constants::paths::{LIST_WALLET_ACCOUNTS, WHOAMI},
        transaction::parse_address,
        types::{
            stamp::{SignedRequest, Stamp, StampKind},
            OrganizationId, WalletId,
        },
    };
    use serde_json::{json, Value};
    use wiremock::{
        matchers::{body_partial_json, header, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn whoami_body() -> Value {
        json!({
            "organizationId": "org-backend",
            "organizationName": "Passkey Wallet",
            "userId": "user-backend",
            "username": "Onboarding Helper",
        })
    }

    #[tokio::test]
    async fn whoami_uses_backend_organization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WHOAMI))
            .and(header_exists("X-Stamp"))
            .and(body_partial_json(json!({ "organizationId": "org-backend" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(whoami_body()))
            .expect(1)
            .mount(&server)
            .await;

        let whoami = test_client(&server).whoami().await.unwrap();
        assert_eq!(whoami.user_id.as_str(), "user-backend");
        assert_eq!(whoami.username, "Onboarding Helper");
    }

    #[tokio::test]
    async fn forwarded_whoami_keeps_user_stamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WHOAMI))
            .and(header("X-Stamp-WebAuthn", "passkey-stamp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(whoami_body()))
            .expect(1)
            .mount(&server)
            .await;

        let request = SignedRequest {
            url: format!("{}{}", server.uri(), WHOAMI),
            body: r#"{"organizationId":"org-backend"}"#.to_string(),
            stamp: Stamp::new(StampKind::WebAuthn, "passkey-stamp"),
        };
        let whoami = test_client(&server).whoami_forwarded(&request).await.unwrap();
        assert_eq!(whoami.organization_name, "Passkey Wallet");
    }

    #[tokio::test]
    async fn wallet_address_requires_one_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LIST_WALLET_ACCOUNTS))
            .and(body_partial_json(json!({ "walletId": "wallet-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accounts": [{
                    "address": "0x08d2b0a37f869ff76bacb5bab3278e26ab7067b7",
                    "path": "m/44'/60'/0'/0/0"
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LIST_WALLET_ACCOUNTS))
            .and(body_partial_json(json!({ "walletId": "wallet-2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accounts": [] })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let organization = OrganizationId::new("sub-alice");

        let address = client
            .get_wallet_address(&organization, &WalletId::new("wallet-1"))
            .await
            .unwrap();
        assert_eq!(
            address,
            parse_address("0x08d2b0a37f869ff76bacb5bab3278e26ab7067b7").unwrap()
        );

        assert!(matches!(
            client
                .get_wallet_address(&organization, &WalletId::new("wallet-2"))
                .await,
            Err(PasskeyWalletClientError::Validation(_))
        ));
    }
}
