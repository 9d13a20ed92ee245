//! Utilities for our logging (tracing) infrastructure.

use std::fmt::Debug;
use tracing::{warn, Span};

/// Number of leading characters kept by [`abbreviate`].
const ABBREVIATED_LEN: usize = 16;

/// For the current active span, record `field_value` for the field
/// `field_name`. The field must already be declared on the span.
///
/// Client operations open a span with empty `organization_id` and
/// `activity_id` fields and fill them in once the custody service has assigned
/// an activity id, so every later event carries them:
/// ```text
///   2023-09-12T10:31:44.102Z  INFO passkey_wallet_client::poller: Activity completed. attempt=3
///     in passkey_wallet_client::api::create_sub_organization::provision with organization_id: "4d0b...", activity_id: "e1f2..."
/// ```
///
/// In debug builds this warns when the field has not been declared.
pub fn record_field(field_name: &str, field_value: &dyn Debug) {
    if cfg!(debug_assertions) && !Span::current().has_field(field_name) {
        warn!("Field {} not defined in current span!", field_name);
    }

    let _ = Span::current().record(field_name, &format!("{field_value:?}"));
}

/// Shorten long opaque strings (stamps, signed payloads, bundles) before they
/// reach a log line.
pub fn abbreviate(value: &str) -> String {
    match value.char_indices().nth(ABBREVIATED_LEN) {
        Some((cut, _)) => format!("{}...({} chars)", &value[..cut], value.chars().count()),
        None => value.to_string(),
    }
}
