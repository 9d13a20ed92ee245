use crate::{CustodyClient, Result};
use passkey_wallet::{
    constants::paths::SIGN_TRANSACTION,
    infrastructure::logging::abbreviate,
    types::{
        operations::sign_transaction::{
            intent::SignTransactionIntent, result::SignTransactionResult,
        },
        OrganizationId,
    },
};
use tracing::{debug, info};

impl CustodyClient {
    pub(crate) async fn handle_sign_transaction(
        &self,
        organization_id: &OrganizationId,
        sign_with: &str,
        unsigned_transaction: &str,
    ) -> Result<String> {
        info!("Starting transaction signing");
        debug!("Unsigned payload: {}", abbreviate(unsigned_transaction));

        let intent = SignTransactionIntent::ethereum(sign_with, unsigned_transaction.to_string());
        let result: SignTransactionResult = self
            .submit_and_extract(SIGN_TRANSACTION, organization_id, intent)
            .await?;

        Ok(result.signed_transaction)
    }
}
