pub mod intent {
    use serde::{Deserialize, Serialize};

    pub const TRANSACTION_TYPE_ETHEREUM: &str = "TRANSACTION_TYPE_ETHEREUM";

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SignTransactionIntent {
        /// Wallet account address or private key id to sign with.
        pub sign_with: String,
        /// Hex signing payload, no `0x` prefix.
        pub unsigned_transaction: String,
        #[serde(rename = "type")]
        pub transaction_type: String,
    }

    impl SignTransactionIntent {
        pub fn ethereum(sign_with: impl Into<String>, unsigned_transaction: String) -> Self {
            Self {
                sign_with: sign_with.into(),
                unsigned_transaction,
                transaction_type: TRANSACTION_TYPE_ETHEREUM.to_string(),
            }
        }
    }
}

pub mod result {
    use crate::types::{
        activity::ActivityType,
        operations::{lookup_string, ActivityResult},
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SignTransactionResult {
        pub signed_transaction: String,
    }

    impl ActivityResult for SignTransactionResult {
        const RESULT_KEYS: &'static [&'static str] = &["signTransactionResult"];

        fn activity_type() -> ActivityType {
            ActivityType::SignTransaction
        }

        fn from_raw(result: &Value) -> Option<Self> {
            Some(Self {
                signed_transaction: lookup_string(result, &["signedTransaction"])?,
            })
        }
    }
}
