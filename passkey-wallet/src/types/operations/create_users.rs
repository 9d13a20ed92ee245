//! Users created outside this crate's typed submissions (e.g. by an operator
//! script) report a `CREATE_USERS` activity.

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
    pub struct CreateUsersResult {
        pub user_ids: Vec<UserId>,
    }

    impl ActivityResult for CreateUsersResult {
        const RESULT_KEYS: &'static [&'static str] = &["createUsersResult"];

        fn activity_type() -> ActivityType {
            ActivityType::CreateUsers
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
