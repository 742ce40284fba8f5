// src/dedup/identity.rs
//! Deterministic dedup keys derived from alert content.
//!
//! Earthquake identities leave the source out so that two feeds reporting the
//! same physical event collapse to one key. Weather/tsunami keys include the
//! local calendar date, so a warning reissued after midnight counts as new.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::alert::{AlertPayload, CanonicalAlert, Earthquake};

/// Time window width used to bucket earthquake event times.
pub const EARTHQUAKE_WINDOW_MS: i64 = 10 * 60 * 1000;
const OTHER_PREFIX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertIdentity(String);

impl AlertIdentity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round down to the nearest half magnitude: 4.49 → 4.0, 4.5 → 4.5.
pub fn magnitude_bucket(mag: f64) -> f64 {
    (mag * 2.0).floor() / 2.0
}

/// 10-minute window index of an epoch-millis timestamp.
pub fn time_bucket(epoch_millis: i64) -> i64 {
    epoch_millis.div_euclid(EARTHQUAKE_WINDOW_MS)
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a feed timestamp to epoch millis. Accepts RFC 3339, epoch seconds/millis
/// and a few naive local formats. `None` if nothing matches.
pub fn parse_event_time(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        // Anything past 1e11 can only be milliseconds.
        return Some(if n.abs() >= 100_000_000_000 { n } else { n * 1000 });
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    NAIVE_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(s, fmt).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    })
}

fn earthquake_identity(q: &Earthquake, now: DateTime<Local>) -> AlertIdentity {
    let millis = parse_event_time(&q.time).unwrap_or_else(|| now.timestamp_millis());
    AlertIdentity(format!(
        "earthquake_{}_{}_{}",
        q.address,
        magnitude_bucket(q.magnitude),
        time_bucket(millis)
    ))
}

/// Derive the identity of `alert`. `now` supplies the calendar date for
/// weather/tsunami keys and the fallback time for earthquakes.
pub fn derive_identity(alert: &CanonicalAlert, now: DateTime<Local>) -> AlertIdentity {
    let date = now.format("%Y-%m-%d");
    match &alert.payload {
        AlertPayload::Earthquake(q) => earthquake_identity(q, now),
        AlertPayload::WeatherAlarm(w) => {
            AlertIdentity(format!("{}_{}_{}", alert.source, w.headline, date))
        }
        AlertPayload::Tsunami(t) => AlertIdentity(format!("{}_{}_{}", alert.source, t.title, date)),
        AlertPayload::Other(v) => {
            let prefix: String = v.to_string().chars().take(OTHER_PREFIX_CHARS).collect();
            AlertIdentity(format!("{}_{}", alert.source, prefix))
        }
    }
}
