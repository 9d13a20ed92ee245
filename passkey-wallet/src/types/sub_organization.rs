//! Sub-organizations: per-user tenants inside the custody service, each with
//! its own root users and exactly one signing key.

use crate::{
    constants::MAX_SUB_ORGANIZATION_NAME_LEN,
    types::{OrganizationId, WalletId},
    Address,
};
use serde::{Deserialize, Serialize};

const NAME_PREFIX: &str = "Passkey Wallet for ";

/// WebAuthn registration output produced by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub credential_id: String,
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub transports: Vec<String>,
}

/// Identifiers of a fully provisioned sub-organization. Only ever built from a
/// completed and validated creation activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubOrganization {
    pub sub_organization_id: OrganizationId,
    pub signing_key_id: WalletId,
    pub derived_address: Address,
}

/// Name of the sub-organization created for `email`.
pub fn sub_organization_name(email: &str) -> String {
    let mut name = String::from(NAME_PREFIX);
    for c in email.chars() {
        match c {
            '@' => name.push_str("-at-"),
            c if c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '+' | '-') => {
                name.push(c)
            }
            _ => name.push('-'),
        }
    }

    // Every character kept above is ASCII, so byte length equals char count.
    name.truncate(MAX_SUB_ORGANIZATION_NAME_LEN);
    name
}
