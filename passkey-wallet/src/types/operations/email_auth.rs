pub mod intent {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EmailAuthIntent {
        pub email: String,
        /// Public key the emailed credential bundle is encrypted to.
        pub target_public_key: String,
    }
}

pub mod result {
    use crate::types::{
        activity::ActivityType,
        operations::{lookup_string, ActivityResult},
        ApiKeyId, UserId,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EmailAuthResult {
        pub user_id: UserId,
        pub api_key_id: ApiKeyId,
    }

    impl ActivityResult for EmailAuthResult {
        const RESULT_KEYS: &'static [&'static str] = &["emailAuthResult"];

        fn activity_type() -> ActivityType {
            ActivityType::EmailAuth
        }

        fn from_raw(result: &Value) -> Option<Self> {
            Some(Self {
                user_id: lookup_string(result, &["userId"])?.into(),
                api_key_id: lookup_string(result, &["apiKeyId"])?.into(),
            })
        }
    }
}
