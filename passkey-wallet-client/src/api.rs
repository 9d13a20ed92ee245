//! Public API of the passkey wallet backend client.
//!
//! Operations either run with the backend's own API key (provisioning,
//! signing for the warchest, email flows, lookups) or relay a request that
//! the end user's browser already stamped with their passkey (export,
//! recovery, sending a transaction). Both kinds wait for the resulting
//! activity and decode its result before returning.

mod create_api_user;
mod create_sub_organization;
mod email;
mod forward;
mod lookup;
mod sign_transaction;

use crate::{CustodyClient, Result, TransactionBuilder};
use passkey_wallet::{
    types::{
        operations::{
            email_auth::result::EmailAuthResult, export_wallet::result::ExportWalletResult,
            whoami::response::WhoamiResponse,
        },
        stamp::SignedRequest,
        sub_organization::{Attestation, SubOrganization},
        OrganizationId, UserId, WalletId,
    },
    Address,
};
use tracing::instrument;

pub use self::{
    create_api_user::{ActivityApiUserCreator, ApiUserCreator, ScriptApiUserCreator},
    forward::{ForwardOutcome, RecoveryOutcome},
};

impl CustodyClient {
    /// Check that the backend's API key works by asking the custody service
    /// who it belongs to.
    #[instrument(skip_all, err(Debug))]
    pub async fn whoami(&self) -> Result<WhoamiResponse> {
        self.handle_whoami(self.organization_id()).await
    }

    /// Relay a whoami query signed by the end user and return the identity
    /// their passkey belongs to.
    #[instrument(skip_all, err(Debug), fields(url = %request.url))]
    pub async fn whoami_forwarded(&self, request: &SignedRequest) -> Result<WhoamiResponse> {
        self.handle_whoami_forwarded(request).await
    }

    /// Create a sub-organization for a new end user.
    ///
    /// The sub-organization has two root users with a quorum of one: the end
    /// user, holding the passkey from `attestation`, and the backend itself.
    /// A single Ethereum account is derived for the user.
    ///
    /// Output: the new sub-organization's identifiers, returned only once the
    /// activity completed and produced exactly one address.
    #[instrument(skip_all, err(Debug), fields(organization_id, activity_id))]
    pub async fn create_user_sub_organization(
        &self,
        email: &str,
        attestation: Attestation,
        challenge: &str,
    ) -> Result<SubOrganization> {
        self.handle_create_user_sub_organization(email, attestation, challenge)
            .await
    }

    /// Have the custody service sign `unsigned_transaction` (hex encoded,
    /// typed payload) with `sign_with` in `organization_id`.
    ///
    /// Output: the signed transaction as returned by the custody service.
    #[instrument(skip_all, err(Debug), fields(organization_id = %organization_id, activity_id))]
    pub async fn sign_transaction(
        &self,
        organization_id: &OrganizationId,
        sign_with: &str,
        unsigned_transaction: &str,
    ) -> Result<String> {
        self.handle_sign_transaction(organization_id, sign_with, unsigned_transaction)
            .await
    }

    /// Relay an activity the end user signed and wait for it to complete.
    ///
    /// The custody service must answer with HTTP 200. If the activity it
    /// returns is still running, it is polled with the backend's own key.
    /// A `RECOVER_USER` activity that rotated away the credential which
    /// stamped it yields [`ForwardOutcome::CompletedCredentialRotated`].
    #[instrument(skip_all, err(Debug), fields(url = %request.url, activity_id))]
    pub async fn forward_signed_activity(&self, request: &SignedRequest) -> Result<ForwardOutcome> {
        self.handle_forward_signed_activity(request).await
    }

    /// Relay a signed `EXPORT_WALLET` activity.
    ///
    /// Output: the export bundle, encrypted to the key the user chose.
    #[instrument(skip_all, err(Debug), fields(url = %request.url, activity_id))]
    pub async fn export_wallet(&self, request: &SignedRequest) -> Result<ExportWalletResult> {
        self.handle_export_wallet(request).await
    }

    /// Relay a signed `RECOVER_USER` activity.
    #[instrument(skip_all, err(Debug), fields(url = %request.url, activity_id))]
    pub async fn recover_user(&self, request: &SignedRequest) -> Result<RecoveryOutcome> {
        self.handle_recover_user(request).await
    }

    /// Relay a signed `SIGN_TRANSACTION` activity and broadcast the signed
    /// transaction it produces.
    ///
    /// Output: the hash of the broadcast transaction.
    #[instrument(skip_all, err(Debug), fields(url = %request.url, activity_id))]
    pub async fn send_signed_transaction(
        &self,
        request: &SignedRequest,
        builder: &TransactionBuilder,
    ) -> Result<String> {
        self.handle_send_signed_transaction(request, builder).await
    }

    /// Start email recovery for a user of `sub_organization_id`. The
    /// recovery bundle is encrypted to `target_public_key`.
    #[instrument(skip_all, err(Debug), fields(organization_id = %sub_organization_id, activity_id))]
    pub async fn init_user_email_recovery(
        &self,
        sub_organization_id: &OrganizationId,
        email: &str,
        target_public_key: &str,
    ) -> Result<UserId> {
        self.handle_init_user_email_recovery(sub_organization_id, email, target_public_key)
            .await
    }

    /// Send an email login credential to a user of `sub_organization_id`,
    /// encrypted to `target_public_key`.
    #[instrument(skip_all, err(Debug), fields(organization_id = %sub_organization_id, activity_id))]
    pub async fn email_auth(
        &self,
        sub_organization_id: &OrganizationId,
        email: &str,
        target_public_key: &str,
    ) -> Result<EmailAuthResult> {
        self.handle_email_auth(sub_organization_id, email, target_public_key)
            .await
    }

    /// Look up the address of a wallet that has exactly one account.
    #[instrument(skip_all, err(Debug), fields(organization_id = %organization_id))]
    pub async fn get_wallet_address(
        &self,
        organization_id: &OrganizationId,
        wallet_id: &WalletId,
    ) -> Result<Address> {
        self.handle_get_wallet_address(organization_id, wallet_id)
            .await
    }
}
