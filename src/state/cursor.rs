//! Monotonic cursor updates
//!
//! A cursor only ever moves forward: the stored value is the max of what
//! was already tracked and what the latest record carries. Records may
//! arrive in any order within a page, so the fold must be order-insensitive.

use crate::fields::{format_datetime, parse_datetime};
use chrono::{DateTime, Utc};

/// Fold one observed cursor value into the tracked cursor.
///
/// Both sides are parsed as datetimes; a side that is missing or
/// unparsable falls back to `default_start`. The result is the later of
/// the two, rendered canonically.
pub fn updated_cursor(
    current: Option<&str>,
    latest: Option<&str>,
    default_start: DateTime<Utc>,
) -> String {
    let current = current.and_then(parse_datetime).unwrap_or(default_start);
    let latest = latest.and_then(parse_datetime).unwrap_or(default_start);
    format_datetime(current.max(latest))
}
