use crate::{CustodyClient, PasskeyWalletClientError, Result};
use passkey_wallet::{
    constants::paths::{EMAIL_AUTH, INIT_USER_EMAIL_RECOVERY},
    types::{
        operations::{
            email_auth::{intent::EmailAuthIntent, result::EmailAuthResult},
            init_user_email_recovery::{
                intent::InitUserEmailRecoveryIntent, result::InitUserEmailRecoveryResult,
            },
        },
        OrganizationId, UserId,
    },
};
use tracing::info;

fn check_email_inputs(email: &str, target_public_key: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(PasskeyWalletClientError::Validation(
            "email must not be empty".to_string(),
        ));
    }
    if target_public_key.is_empty() || hex::decode(target_public_key).is_err() {
        return Err(PasskeyWalletClientError::Validation(
            "target public key must be hex".to_string(),
        ));
    }
    Ok(())
}

impl CustodyClient {
    pub(crate) async fn handle_init_user_email_recovery(
        &self,
        sub_organization_id: &OrganizationId,
        email: &str,
        target_public_key: &str,
    ) -> Result<UserId> {
        info!("Starting email recovery");
        check_email_inputs(email, target_public_key)?;

        let intent = InitUserEmailRecoveryIntent {
            email: email.to_string(),
            target_public_key: target_public_key.to_string(),
        };
        let result: InitUserEmailRecoveryResult = self
            .submit_and_extract(INIT_USER_EMAIL_RECOVERY, sub_organization_id, intent)
            .await?;
        Ok(result.user_id)
    }

    pub(crate) async fn handle_email_auth(
        &self,
        sub_organization_id: &OrganizationId,
        email: &str,
        target_public_key: &str,
    ) -> Result<EmailAuthResult> {
        info!("Starting email auth");
        check_email_inputs(email, target_public_key)?;

        let intent = EmailAuthIntent {
            email: email.to_string(),
            target_public_key: target_public_key.to_string(),
        };
        self.submit_and_extract(EMAIL_AUTH, sub_organization_id, intent)
            .await
    }
}
