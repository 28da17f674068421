use chrono::{DateTime, Utc};

#[must_use]
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

/// `mm:ss` countdown label. Partial seconds round up so `00:00` only shows at expiry.
/// Minutes are not wrapped into hours.
#[must_use]
pub fn format_countdown(remaining_millis: u64) -> String {
    let secs = remaining_millis.div_ceil(1_000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Elapsed time label, truncated to whole seconds.
#[must_use]
pub fn format_elapsed(millis: u64) -> String {
    let secs = millis / 1_000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
