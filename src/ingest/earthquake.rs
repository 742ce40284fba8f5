// src/ingest/earthquake.rs
//! Alias-tolerant extraction of earthquake records.
//!
//! Upstream feeds disagree on field names (`mag` vs `magnitude` vs `Magnitude`, ...).
//! Each logical field has an ordered alias list; the first present, non-null value wins.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::alert::Earthquake;

pub const MAG_FIELDS: &[&str] = &["mag", "magnitude", "Magnitude"];
pub const ADDRESS_FIELDS: &[&str] = &["address", "placeName", "place", "location"];
pub const TIME_FIELDS: &[&str] = &["time", "shockTime", "updateTime", "eventTime"];
pub const DEPTH_FIELDS: &[&str] = &["depth", "Depth"];
pub const LAT_FIELDS: &[&str] = &["latitude", "Latitude"];
pub const LON_FIELDS: &[&str] = &["longitude", "Longitude"];
pub const ID_FIELDS: &[&str] = &["id", "eventId", "EventId"];

/// Display format used when the feed gives no event time.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn first_present<'a>(data: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|f| data.get(*f))
        .find(|v| !v.is_null())
}

/// Render a scalar JSON value as plain text (strings unquoted).
pub(crate) fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Leading decimal number of a string ("4.5", " 5.1级", "-0.3km"); `None` if there is none.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}

fn magnitude_of(v: &Value) -> Option<f64> {
    let m = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }?;
    m.is_finite().then_some(m)
}

/// Extract an earthquake from one `Data` payload. `None` unless both a numeric
/// magnitude and a non-empty address resolve.
pub fn extract(data: &Value, now: DateTime<Local>) -> Option<Earthquake> {
    let magnitude = first_present(data, MAG_FIELDS).and_then(magnitude_of)?;
    let address = first_present(data, ADDRESS_FIELDS)
        .map(value_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let text_or = |fields: &[&str], fallback: String| {
        first_present(data, fields)
            .map(value_text)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
    };

    Some(Earthquake {
        id: text_or(ID_FIELDS, now.timestamp_millis().to_string()),
        address,
        magnitude,
        depth: text_or(DEPTH_FIELDS, String::new()),
        time: text_or(TIME_FIELDS, now.format(LOCAL_TIME_FORMAT).to_string()),
        latitude: text_or(LAT_FIELDS, String::new()),
        longitude: text_or(LON_FIELDS, String::new()),
    })
}
