pub mod result {
    use crate::types::{
        activity::ActivityType,
        operations::{expect_count, lookup_strings, ActivityResult},
        AuthenticatorId,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RecoverUserResult {
        /// The new passkey registered by the recovering user.
        pub authenticator_id: Vec<AuthenticatorId>,
    }

    impl ActivityResult for RecoverUserResult {
        const RESULT_KEYS: &'static [&'static str] = &["recoverUserResult"];

        fn activity_type() -> ActivityType {
            ActivityType::RecoverUser
        }

        fn from_raw(result: &Value) -> Option<Self> {
            Some(Self {
                authenticator_id: lookup_strings(result, &["authenticatorId"])?
                    .into_iter()
                    .map(AuthenticatorId::from)
                    .collect(),
            })
        }

        fn validate(&self) -> Result<(), String> {
            expect_count("authenticator ids", &self.authenticator_id, 1)
        }
    }
}
