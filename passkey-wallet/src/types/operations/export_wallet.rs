pub mod result {
    use crate::types::{
        activity::ActivityType,
        operations::{lookup_string, ActivityResult},
        WalletId,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    /// The bundle is encrypted to the browser's target key; the backend only
    /// passes it through.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExportWalletResult {
        #[serde(default)]
        pub wallet_id: Option<WalletId>,
        pub export_bundle: String,
    }

    impl ActivityResult for ExportWalletResult {
        const RESULT_KEYS: &'static [&'static str] = &["exportWalletResult"];

        fn activity_type() -> ActivityType {
            ActivityType::ExportWallet
        }

        fn from_raw(result: &Value) -> Option<Self> {
            Some(Self {
                wallet_id: lookup_string(result, &["walletId"]).map(WalletId::from),
                export_bundle: lookup_string(result, &["exportBundle"])?,
            })
        }
    }
}
