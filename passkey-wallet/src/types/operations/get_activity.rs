pub mod request {
    use crate::types::{ActivityId, OrganizationId};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GetActivityRequest {
        pub activity_id: ActivityId,
        pub organization_id: OrganizationId,
    }
}

/// `get_activity` answers with the same envelope as a submission.
pub mod response {
    pub use crate::types::activity::ActivityResponse as GetActivityResponse;
}
