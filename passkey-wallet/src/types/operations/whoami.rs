pub mod request {
    use crate::types::OrganizationId;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WhoamiRequest {
        pub organization_id: OrganizationId,
    }
}

pub mod response {
    use crate::types::{OrganizationId, UserId};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WhoamiResponse {
        pub organization_id: OrganizationId,
        pub organization_name: String,
        pub user_id: UserId,
        pub username: String,
    }
}
