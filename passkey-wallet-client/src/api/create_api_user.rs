//! Creating API-only users inside an organization.
//!
//! Two ways are supported behind [`ApiUserCreator`]: a typed
//! `CREATE_API_ONLY_USERS` submission, and an operator script that creates
//! the user itself and prints the activity it produced.

use crate::{extractor::extract, CustodyClient, PasskeyWalletClientError, Result};
use async_trait::async_trait;
use passkey_wallet::{
    constants::paths::CREATE_API_ONLY_USERS,
    infrastructure::logging::abbreviate,
    types::{
        activity::ActivityResponse,
        operations::{
            create_api_only_users::{
                intent::CreateApiOnlyUsersIntent, result::CreateApiOnlyUsersResult,
            },
            create_users::result::CreateUsersResult,
        },
        OrganizationId, UserId,
    },
};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Shell the user creation script runs under.
pub const SCRIPT_SHELL: &str = "bash";

#[async_trait]
pub trait ApiUserCreator: Send + Sync {
    /// Create a user in `organization_id` that authenticates with the API
    /// key `public_key` only.
    async fn create_api_user(
        &self,
        organization_id: &OrganizationId,
        user_name: &str,
        public_key: &str,
    ) -> Result<UserId>;
}

#[derive(Clone, Debug)]
pub struct ActivityApiUserCreator {
    client: CustodyClient,
}

impl ActivityApiUserCreator {
    pub fn new(client: CustodyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApiUserCreator for ActivityApiUserCreator {
    #[instrument(skip_all, err(Debug), fields(organization_id = %organization_id, activity_id))]
    async fn create_api_user(
        &self,
        organization_id: &OrganizationId,
        user_name: &str,
        public_key: &str,
    ) -> Result<UserId> {
        info!("Starting API user creation");
        let intent = CreateApiOnlyUsersIntent::single(user_name, public_key);
        let result: CreateApiOnlyUsersResult = self
            .client
            .submit_and_extract(CREATE_API_ONLY_USERS, organization_id, intent)
            .await?;
        Ok(result.user_ids[0].clone())
    }
}

/// Runs `<script> <organization id> <user name> <public key>` and reads the
/// activity response it prints on stdout.
#[derive(Clone, Debug)]
pub struct ScriptApiUserCreator {
    client: CustodyClient,
    script: PathBuf,
}

impl ScriptApiUserCreator {
    pub fn new(client: CustodyClient, script: impl Into<PathBuf>) -> Self {
        Self {
            client,
            script: script.into(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl ApiUserCreator for ScriptApiUserCreator {
    #[instrument(skip_all, err(Debug), fields(organization_id = %organization_id))]
    async fn create_api_user(
        &self,
        organization_id: &OrganizationId,
        user_name: &str,
        public_key: &str,
    ) -> Result<UserId> {
        info!("Starting API user creation script {}", self.script.display());
        let output = Command::new(SCRIPT_SHELL)
            .arg(&self.script)
            .arg(organization_id.as_str())
            .arg(user_name)
            .arg(public_key)
            .output()
            .await?;

        if !output.status.success() {
            return Err(PasskeyWalletClientError::ApiUserScript(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Script output: {}", abbreviate(stdout.trim()));
        let ActivityResponse { activity } = serde_json::from_str(stdout.trim()).map_err(|e| {
            PasskeyWalletClientError::ApiUserScript(format!("unreadable output: {e}"))
        })?;

        let activity = self.client.wait_for_completion(activity).await?;
        let result: CreateUsersResult = extract(&activity)?;
        Ok(result.user_ids[0].clone())
    }
}
