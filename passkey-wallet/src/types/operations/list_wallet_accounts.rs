pub mod request {
    use crate::types::{OrganizationId, WalletId};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListWalletAccountsRequest {
        pub organization_id: OrganizationId,
        pub wallet_id: WalletId,
    }
}

pub mod response {
    use crate::Address;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListWalletAccountsResponse {
        pub accounts: Vec<WalletAccount>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletAccount {
        pub address: Address,
        #[serde(default)]
        pub path: Option<String>,
    }
}
