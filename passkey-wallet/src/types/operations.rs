//! Request and result shapes of the custody operations used by the backend.
//!
//! Activity operations have an `intent` module (the `parameters` submitted)
//! and a `result` module (what a completed activity carries under
//! `activity.result`). Read-only queries have `request` and `response`
//! modules instead.

pub mod create_api_only_users;
pub mod create_sub_organization;
pub mod create_users;
pub mod email_auth;
pub mod export_wallet;
pub mod get_activity;
pub mod init_user_email_recovery;
pub mod list_wallet_accounts;
pub mod recover_user;
pub mod sign_transaction;
pub mod whoami;

use crate::types::activity::ActivityType;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A row of the result decoder table.
///
/// Decoding tries each of [`ActivityResult::RESULT_KEYS`] in order. Under a
/// present key the typed `Deserialize` impl runs first; if it fails,
/// [`ActivityResult::from_raw`] rebuilds the value field by field from fixed
/// paths in the raw JSON.
pub trait ActivityResult: DeserializeOwned + Sized {
    /// Keys under `activity.result`, newest schema first.
    const RESULT_KEYS: &'static [&'static str];

    fn activity_type() -> ActivityType;

    /// Field-by-field fallback over the raw object found under a result key.
    fn from_raw(result: &Value) -> Option<Self>;

    /// Check cardinality invariants of a decoded result. The error describes
    /// the violated invariant.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Follow `path` through nested JSON objects.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

pub fn lookup_string(value: &Value, path: &[&str]) -> Option<String> {
    lookup(value, path)?.as_str().map(str::to_string)
}

/// String array at `path`. Non-string elements make the whole lookup fail.
pub fn lookup_strings(value: &Value, path: &[&str]) -> Option<Vec<String>> {
    lookup(value, path)?
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Check that a result list holds exactly `expected` items.
pub fn expect_count<T>(field: &str, items: &[T], expected: usize) -> Result<(), String> {
    if items.len() == expected {
        Ok(())
    } else {
        Err(format!(
            "expected exactly {expected} {field}, found {}",
            items.len()
        ))
    }
}
