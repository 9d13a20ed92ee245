pub mod intent {
    use crate::types::operations::create_sub_organization::intent::ApiKeyParams;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateApiOnlyUsersIntent {
        pub api_only_users: Vec<ApiOnlyUser>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ApiOnlyUser {
        pub user_name: String,
        pub api_keys: Vec<ApiKeyParams>,
        #[serde(default)]
        pub user_tags: Vec<String>,
    }

    impl CreateApiOnlyUsersIntent {
        /// A single API-only user holding one key.
        pub fn single(user_name: &str, public_key: &str) -> Self {
            Self {
                api_only_users: vec![ApiOnlyUser {
                    user_name: user_name.to_string(),
                    api_keys: vec![ApiKeyParams {
                        api_key_name: format!("{user_name} key"),
                        public_key: public_key.to_string(),
                    }],
                    user_tags: Vec::new(),
                }],
            }
        }
    }
}

pub mod result {
    use crate::types::{
        activity::ActivityType,
        operations::{expect_count, lookup_strings, ActivityResult},
        UserId,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateApiOnlyUsersResult {
        pub user_ids: Vec<UserId>,
    }

    impl ActivityResult for CreateApiOnlyUsersResult {
        const RESULT_KEYS: &'static [&'static str] = &["createApiOnlyUsersResult"];

        fn activity_type() -> ActivityType {
            ActivityType::CreateApiOnlyUsers
        }

        fn from_raw(result: &Value) -> Option<Self> {
            Some(Self {
                user_ids: lookup_strings(result, &["userIds"])?
                    .into_iter()
                    .map(UserId::from)
                    .collect(),
            })
        }

        fn validate(&self) -> Result<(), String> {
            expect_count("user ids", &self.user_ids, 1)
        }
    }
}
