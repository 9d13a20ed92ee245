pub mod intent {
    use crate::types::sub_organization::{sub_organization_name, Attestation};
    use serde::{Deserialize, Serialize};

    pub const ROOT_QUORUM_THRESHOLD: u32 = 1;
    pub const ETHEREUM_ACCOUNT_PATH: &str = "m/44'/60'/0'/0/0";

    const END_USER_NAME: &str = "Wallet User";
    const END_USER_AUTHENTICATOR_NAME: &str = "End-User Passkey";
    const SERVICE_USER_NAME: &str = "Onboarding Helper";
    const SERVICE_API_KEY_NAME: &str = "Passkey Wallet Backend";
    const WALLET_NAME: &str = "Default Wallet";

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateSubOrganizationIntent {
        pub sub_organization_name: String,
        pub root_users: Vec<RootUser>,
        pub root_quorum_threshold: u32,
        pub wallet: WalletParams,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RootUser {
        pub user_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub user_email: Option<String>,
        pub api_keys: Vec<ApiKeyParams>,
        pub authenticators: Vec<AuthenticatorParams>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ApiKeyParams {
        pub api_key_name: String,
        pub public_key: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AuthenticatorParams {
        pub authenticator_name: String,
        pub challenge: String,
        pub attestation: Attestation,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletParams {
        pub wallet_name: String,
        pub accounts: Vec<WalletAccountParams>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletAccountParams {
        pub curve: String,
        pub path_format: String,
        pub path: String,
        pub address_format: String,
    }

    impl WalletAccountParams {
        pub fn ethereum() -> Self {
            Self {
                curve: "CURVE_SECP256K1".to_string(),
                path_format: "PATH_FORMAT_BIP32".to_string(),
                path: ETHEREUM_ACCOUNT_PATH.to_string(),
                address_format: "ADDRESS_FORMAT_ETHEREUM".to_string(),
            }
        }
    }

    impl CreateSubOrganizationIntent {
        /// Sub-organization for a new end user: the user's passkey and the
        /// backend's API key are both root users, either can act alone, and a
        /// single Ethereum account is derived.
        pub fn for_user(
            email: &str,
            attestation: Attestation,
            challenge: &str,
            backend_public_key: &str,
        ) -> Self {
            let end_user = RootUser {
                user_name: END_USER_NAME.to_string(),
                user_email: Some(email.to_string()),
                api_keys: Vec::new(),
                authenticators: vec![AuthenticatorParams {
                    authenticator_name: END_USER_AUTHENTICATOR_NAME.to_string(),
                    challenge: challenge.to_string(),
                    attestation,
                }],
            };
            let service_user = RootUser {
                user_name: SERVICE_USER_NAME.to_string(),
                user_email: None,
                api_keys: vec![ApiKeyParams {
                    api_key_name: SERVICE_API_KEY_NAME.to_string(),
                    public_key: backend_public_key.to_string(),
                }],
                authenticators: Vec::new(),
            };

            Self {
                sub_organization_name: sub_organization_name(email),
                root_users: vec![end_user, service_user],
                root_quorum_threshold: ROOT_QUORUM_THRESHOLD,
                wallet: WalletParams {
                    wallet_name: WALLET_NAME.to_string(),
                    accounts: vec![WalletAccountParams::ethereum()],
                },
            }
        }
    }
}

pub mod result {
    use crate::{
        transaction::parse_address,
        types::{
            activity::ActivityType,
            operations::{expect_count, lookup_string, lookup_strings, ActivityResult},
            sub_organization::SubOrganization,
            OrganizationId, WalletId,
        },
        Address,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateSubOrganizationResult {
        pub sub_organization_id: OrganizationId,
        pub wallet: WalletResult,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletResult {
        pub wallet_id: WalletId,
        pub addresses: Vec<Address>,
    }

    impl ActivityResult for CreateSubOrganizationResult {
        const RESULT_KEYS: &'static [&'static str] = &[
            "createSubOrganizationResultV4",
            "createSubOrganizationResult",
        ];

        fn activity_type() -> ActivityType {
            ActivityType::CreateSubOrganization
        }

        fn from_raw(result: &Value) -> Option<Self> {
            let addresses = lookup_strings(result, &["wallet", "addresses"])?
                .iter()
                .map(|address| parse_address(address).ok())
                .collect::<Option<Vec<_>>>()?;

            Some(Self {
                sub_organization_id: lookup_string(result, &["subOrganizationId"])?.into(),
                wallet: WalletResult {
                    wallet_id: lookup_string(result, &["wallet", "walletId"])?.into(),
                    addresses,
                },
            })
        }

        fn validate(&self) -> Result<(), String> {
            expect_count("wallet addresses", &self.wallet.addresses, 1)
        }
    }

    impl CreateSubOrganizationResult {
        pub fn into_sub_organization(self) -> Result<SubOrganization, String> {
            self.validate()?;
            let derived_address = self.wallet.addresses[0];
            Ok(SubOrganization {
                sub_organization_id: self.sub_organization_id,
                signing_key_id: self.wallet.wallet_id,
                derived_address,
            })
        }
    }
}
