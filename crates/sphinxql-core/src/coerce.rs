//! Field value coercion into the scalars the daemon accepts.
//!
//! - timestamps become epoch seconds, reading the calendar fields as local time
//! - booleans become `1` / `0`
//! - lists become one comma-joined text value
//! - integers and floats pass through
//! - everything else becomes text

use chrono::{Local, NaiveDateTime, TimeZone};

use crate::types::{DaemonValue, FieldValue};

pub fn coerce(value: &FieldValue) -> DaemonValue {
    match value {
        FieldValue::Timestamp(dt) => DaemonValue::Int(local_epoch_seconds(dt)),
        FieldValue::Bool(b) => DaemonValue::Int(i64::from(*b)),
        FieldValue::List(items) => DaemonValue::Text(items.iter().map(coerce_text).collect::<Vec<_>>().join(",")),
        FieldValue::Int(i) => DaemonValue::Int(*i),
        FieldValue::Float(f) => DaemonValue::Float(*f),
        FieldValue::Text(s) => DaemonValue::Text(s.clone()),
        FieldValue::Date(d) => DaemonValue::Text(d.format("%Y-%m-%d").to_string()),
        FieldValue::Null => DaemonValue::Text(String::new()),
    }
}

/// Text form of a value, used for list elements.
pub fn coerce_text(value: &FieldValue) -> String { coerce(value).to_string() }

/// Epoch seconds for a wall-clock time in the local zone.
///
/// Ambiguous times (DST fold) take the earlier instant; times inside a DST
/// gap fall back to reading the fields as UTC.
pub fn local_epoch_seconds(dt: &NaiveDateTime) -> i64 { epoch_seconds_in(&Local, dt) }

/// Epoch seconds for a wall-clock time read in `zone`.
pub fn epoch_seconds_in<Tz: TimeZone>(zone: &Tz, dt: &NaiveDateTime) -> i64 {
    zone.from_local_datetime(dt)
        .earliest()
        .map(|t| t.timestamp())
        .unwrap_or_else(|| dt.and_utc().timestamp())
}
