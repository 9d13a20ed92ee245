//! Decodes the type-specific result of a completed activity.
//!
//! Each result type is one row of the decoder table (see
//! [`ActivityResult`]): the activity type it belongs to, the result keys it
//! may appear under, a typed decoder and a path-based fallback.

use crate::{PasskeyWalletClientError, Result};
use passkey_wallet::types::{
    activity::{Activity, ActivityStatus},
    operations::ActivityResult,
};
use tracing::debug;

/// Decode the result of `activity` as `T`, enforcing `T`'s cardinality
/// invariants. Fails with `Validation` when the activity is not a completed
/// activity of `T`'s type or when neither decoder can read the result.
pub fn extract<T: ActivityResult>(activity: &Activity) -> Result<T> {
    if activity.status != ActivityStatus::Completed {
        return Err(PasskeyWalletClientError::Validation(format!(
            "activity {} is {}, not completed",
            activity.id, activity.status
        )));
    }
    let expected_type = T::activity_type();
    if activity.activity_type != expected_type {
        return Err(PasskeyWalletClientError::Validation(format!(
            "activity {} is {}, expected {}",
            activity.id, activity.activity_type, expected_type
        )));
    }
    let result = activity.result.as_ref().ok_or_else(|| {
        PasskeyWalletClientError::Validation(format!("activity {} has no result", activity.id))
    })?;

    for key in T::RESULT_KEYS {
        let Some(raw) = result.get(*key) else {
            continue;
        };

        let decoded = match serde_json::from_value::<T>(raw.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("Typed decoding of {} failed, using field paths: {}", key, e);
                T::from_raw(raw).ok_or_else(|| {
                    PasskeyWalletClientError::Validation(format!(
                        "cannot decode {key} of activity {}: {e}",
                        activity.id
                    ))
                })?
            }
        };

        decoded
            .validate()
            .map_err(PasskeyWalletClientError::Validation)?;
        return Ok(decoded);
    }

    Err(PasskeyWalletClientError::Validation(format!(
        "activity {} has none of the result keys {:?}",
        activity.id,
        T::RESULT_KEYS
    )))
}
