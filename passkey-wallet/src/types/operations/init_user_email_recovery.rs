pub mod intent {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InitUserEmailRecoveryIntent {
        pub email: String,
        /// Public key the recovery bundle is encrypted to.
        pub target_public_key: String,
    }
}

pub mod result {
    use crate::types::{
        activity::ActivityType,
        operations::{lookup_string, ActivityResult},
        UserId,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InitUserEmailRecoveryResult {
        pub user_id: UserId,
    }

    impl ActivityResult for InitUserEmailRecoveryResult {
        const RESULT_KEYS: &'static [&'static str] = &["initUserEmailRecoveryResult"];

        fn activity_type() -> ActivityType {
            ActivityType::InitUserEmailRecovery
        }

        fn from_raw(result: &Value) -> Option<Self> {
            Some(Self {
                user_id: lookup_string(result, &["userId"])?.into(),
            })
        }
    }
}
