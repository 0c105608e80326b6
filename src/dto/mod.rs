use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Game views and request payloads.
pub mod game;
/// Validation helpers for request payloads.
pub mod validation;

/// Format a timestamp as RFC 3339 for client-facing views.
pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
