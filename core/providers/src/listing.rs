//! Folder/file listing normalization.
//!
//! Providers disagree on field names and on whether numbers arrive as JSON
//! numbers or strings. The helpers here coerce tolerantly: a missing or
//! unparsable field becomes `None`, a missing array becomes empty.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use vidrelay_common::{Listing, ListingItem, Result};

/// Array under `key`, or an empty slice.
pub fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String field; numbers are rendered. Empty strings count as absent.
pub fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unsigned integer field from a number or a numeric string.
///
/// Fractional values are truncated.
pub fn u64_field(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| *f >= 0.0)
                    .map(|f| f as u64)
            })
        }
        _ => None,
    }
}

/// Floating point field from a number or a numeric string.
pub fn f64_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse the timestamp shapes providers send: RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// or a Unix epoch in seconds or milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            s.parse::<i64>().ok().and_then(from_epoch)
        }
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    // Anything past 10^11 is milliseconds; seconds won't get there until year 5138.
    if raw.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}

/// Timestamp field rendered as RFC 3339, falling back to the raw string.
pub fn timestamp_field(value: &Value, key: &str) -> Option<String> {
    let raw = value.get(key)?;
    match parse_timestamp(raw) {
        Some(dt) => Some(dt.to_rfc3339()),
        None => raw.as_str().filter(|s| !s.is_empty()).map(str::to_string),
    }
}

/// Map every element of `items` that yields an entry; entries without an
/// id are dropped.
pub fn collect_items<F>(items: &[Value], map: F) -> Vec<ListingItem>
where
    F: Fn(&Value) -> Option<ListingItem>,
{
    items.iter().filter_map(map).collect()
}

/// Merge the halves of a split listing.
///
/// A failed half contributes nothing; the listing as a whole never fails.
pub fn merge_split(
    provider: &str,
    folders: Result<Vec<ListingItem>>,
    files: Result<Vec<ListingItem>>,
) -> Listing {
    let folders = folders.unwrap_or_else(|e| {
        warn!("{} folder listing failed, showing no folders: {}", provider, e);
        Vec::new()
    });
    let files = files.unwrap_or_else(|e| {
        warn!("{} file listing failed, showing no files: {}", provider, e);
        Vec::new()
    });
    Listing { folders, files }
}
