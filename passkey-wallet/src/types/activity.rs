//! Activities: asynchronous operations executed by the custody service and
//! tracked through a status lifecycle.

use crate::{
    types::{ActivityId, OrganizationId},
    PasskeyWalletError,
};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{convert::Infallible, fmt::Display, str::FromStr};
use strum::{Display as StrumDisplay, EnumString};
use time::OffsetDateTime;

/// The kind of operation an activity performs.
///
/// Variants cover the activities this backend submits, forwards or decodes.
/// Any other type reported by the service is kept verbatim in
/// [`ActivityType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum ActivityType {
    CreateSubOrganization,
    SignTransaction,
    ExportWallet,
    InitUserEmailRecovery,
    RecoverUser,
    EmailAuth,
    CreateApiOnlyUsers,
    CreateUsers,
    Other(String),
}

impl ActivityType {
    /// Name used when submitting this activity. Versioned activities always
    /// submit the newest schema this crate understands.
    pub fn wire_name(&self) -> &str {
        match self {
            Self::CreateSubOrganization => "ACTIVITY_TYPE_CREATE_SUB_ORGANIZATION_V4",
            Self::SignTransaction => "ACTIVITY_TYPE_SIGN_TRANSACTION_V2",
            Self::ExportWallet => "ACTIVITY_TYPE_EXPORT_WALLET",
            Self::InitUserEmailRecovery => "ACTIVITY_TYPE_INIT_USER_EMAIL_RECOVERY",
            Self::RecoverUser => "ACTIVITY_TYPE_RECOVER_USER",
            Self::EmailAuth => "ACTIVITY_TYPE_EMAIL_AUTH",
            Self::CreateApiOnlyUsers => "ACTIVITY_TYPE_CREATE_API_ONLY_USERS",
            Self::CreateUsers => "ACTIVITY_TYPE_CREATE_USERS_V2",
            Self::Other(name) => name,
        }
    }
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ActivityType {
    type Err = Infallible;

    /// Parses any schema version of a known activity, so results of older
    /// activities still route to the right decoder.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let activity_type = match strip_version(s) {
            "ACTIVITY_TYPE_CREATE_SUB_ORGANIZATION" => Self::CreateSubOrganization,
            "ACTIVITY_TYPE_SIGN_TRANSACTION" => Self::SignTransaction,
            "ACTIVITY_TYPE_EXPORT_WALLET" => Self::ExportWallet,
            "ACTIVITY_TYPE_INIT_USER_EMAIL_RECOVERY" => Self::InitUserEmailRecovery,
            "ACTIVITY_TYPE_RECOVER_USER" => Self::RecoverUser,
            "ACTIVITY_TYPE_EMAIL_AUTH" => Self::EmailAuth,
            "ACTIVITY_TYPE_CREATE_API_ONLY_USERS" => Self::CreateApiOnlyUsers,
            "ACTIVITY_TYPE_CREATE_USERS" => Self::CreateUsers,
            _ => Self::Other(s.to_string()),
        };
        Ok(activity_type)
    }
}

/// Strip a trailing `_V<digits>` schema version.
fn strip_version(name: &str) -> &str {
    match name.rsplit_once("_V") {
        Some((base, version))
            if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
pub enum ActivityStatus {
    #[serde(rename = "ACTIVITY_STATUS_CREATED")]
    #[strum(serialize = "ACTIVITY_STATUS_CREATED")]
    Created,
    #[serde(rename = "ACTIVITY_STATUS_PENDING")]
    #[strum(serialize = "ACTIVITY_STATUS_PENDING")]
    Pending,
    #[serde(rename = "ACTIVITY_STATUS_COMPLETED")]
    #[strum(serialize = "ACTIVITY_STATUS_COMPLETED")]
    Completed,
    #[serde(rename = "ACTIVITY_STATUS_FAILED")]
    #[strum(serialize = "ACTIVITY_STATUS_FAILED")]
    Failed,
    #[serde(rename = "ACTIVITY_STATUS_CONSENSUS_NEEDED")]
    #[strum(serialize = "ACTIVITY_STATUS_CONSENSUS_NEEDED")]
    ConsensusNeeded,
    #[serde(rename = "ACTIVITY_STATUS_REJECTED")]
    #[strum(serialize = "ACTIVITY_STATUS_REJECTED")]
    Rejected,
}

/// Terminal statuses that are not success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
pub enum TerminalFailureKind {
    ConsensusNeeded,
    Rejected,
    Failed,
}

/// What a status means for a caller waiting on the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    InProgress,
    Completed,
    Failed(TerminalFailureKind),
}

impl ActivityStatus {
    pub fn outcome(self) -> StatusOutcome {
        match self {
            Self::Created | Self::Pending => StatusOutcome::InProgress,
            Self::Completed => StatusOutcome::Completed,
            Self::ConsensusNeeded => StatusOutcome::Failed(TerminalFailureKind::ConsensusNeeded),
            Self::Rejected => StatusOutcome::Failed(TerminalFailureKind::Rejected),
            Self::Failed => StatusOutcome::Failed(TerminalFailureKind::Failed),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self.outcome(), StatusOutcome::InProgress)
    }

    /// Parse a status string as reported by the custody service.
    pub fn parse(status: &str) -> Result<Self, PasskeyWalletError> {
        status
            .parse()
            .map_err(|_| PasskeyWalletError::InvalidActivityStatus(status.to_string()))
    }
}

/// An activity as reported by the custody service. The type-specific result
/// stays raw JSON until a decoder claims it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub organization_id: OrganizationId,
    pub status: ActivityStatus,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Envelope returned by both activity submission and `get_activity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub activity: Activity,
}

/// Body of an activity submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest<P> {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub timestamp_ms: String,
    pub organization_id: OrganizationId,
    pub parameters: P,
}

impl<P> ActivityRequest<P> {
    pub fn new(activity_type: ActivityType, organization_id: OrganizationId, parameters: P) -> Self {
        let now_ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Self {
            activity_type,
            timestamp_ms: now_ms.to_string(),
            organization_id,
            parameters,
        }
    }
}
