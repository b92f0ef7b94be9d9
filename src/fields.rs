//! Nested JSON field access
//!
//! Provider records are deeply nested JSON objects. Cursor values, primary
//! keys, and datetime fields are addressed by a key path: a sequence of
//! object keys from the record root.
//!
//! Traversal is strict about shape: only objects are descended into.
//! A path that runs through an array or scalar resolves to nothing rather
//! than erroring, and in-place updates silently do nothing unless the full
//! path resolves.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Get a reference to the value at `path`, or None if any intermediate
/// key is missing or not an object.
pub fn get_field<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let (terminal, parents) = path.split_last()?;
    let mut current = record;
    for key in parents {
        current = current.as_object()?.get(*key)?;
    }
    current.as_object()?.get(*terminal)
}

/// Apply `update` to the value at `path` in place.
///
/// A no-op unless the parent path resolves to an object that already
/// contains the terminal key. Missing or misshapen paths are ignored.
pub fn update_field(record: &mut Value, path: &[&str], update: impl FnOnce(&Value) -> Value) {
    let Some((terminal, parents)) = path.split_last() else {
        return;
    };
    let mut current = record;
    for key in parents {
        let Some(next) = current.as_object_mut().and_then(|m| m.get_mut(*key)) else {
            return;
        };
        current = next;
    }
    if let Some(map) = current.as_object_mut() {
        if let Some(value) = map.get(*terminal) {
            let updated = update(value);
            map.insert((*terminal).to_string(), updated);
        }
    }
}

/// Parse a provider datetime string.
///
/// Accepts RFC 3339 (`2021-06-01T10:00:00+00:00`, `...Z`) as well as the
/// compact offset notation some providers emit (`+0300`), with or without
/// fractional seconds.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

/// Render a datetime in the canonical cursor format (`+00:00` offset,
/// whole seconds).
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Rewrite the datetime string at `path` to the canonical format.
///
/// Unparsable or missing values are left untouched.
pub fn normalize_datetime(record: &mut Value, path: &[&str]) {
    update_field(record, path, |value| {
        let Some(parsed) = value.as_str().and_then(parse_datetime) else {
            return value.clone();
        };
        Value::String(format_datetime(parsed))
    });
}
