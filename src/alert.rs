// src/alert.rs
//! Canonical alert model shared by the normalizer, filter, dedup and dispatch stages.

use serde::{Deserialize, Serialize};

/// Alert family a source produces. Wire names follow the feed config (`weatheralarm`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Earthquake,
    #[serde(rename = "weatheralarm")]
    WeatherAlarm,
    Tsunami,
    #[serde(other)]
    Other,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Earthquake => "earthquake",
            AlertKind::WeatherAlarm => "weatheralarm",
            AlertKind::Tsunami => "tsunami",
            AlertKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earthquake {
    /// Upstream event id, or the ingestion timestamp (ms) when the feed has none.
    pub id: String,
    pub address: String,
    pub magnitude: f64,
    pub depth: String,
    /// Event time as reported (string or epoch number rendered as string).
    pub time: String,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlarm {
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effective: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tsunami {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub alarm_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertPayload {
    Earthquake(Earthquake),
    WeatherAlarm(WeatherAlarm),
    Tsunami(Tsunami),
    Other(serde_json::Value),
}

/// One normalized alert. `source` is always a key present in `Config::sources`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAlert {
    pub source: String,
    pub payload: AlertPayload,
}

impl CanonicalAlert {
    pub fn kind(&self) -> AlertKind {
        match &self.payload {
            AlertPayload::Earthquake(_) => AlertKind::Earthquake,
            AlertPayload::WeatherAlarm(_) => AlertKind::WeatherAlarm,
            AlertPayload::Tsunami(_) => AlertKind::Tsunami,
            AlertPayload::Other(_) => AlertKind::Other,
        }
    }

    /// Short one-line description for "received" logs.
    pub fn summary(&self) -> String {
        match &self.payload {
            AlertPayload::Earthquake(q) => format!(
                "earthquake {} M{} depth {} at {}",
                q.address, q.magnitude, q.depth, q.time
            ),
            AlertPayload::WeatherAlarm(w) => format!(
                "weather {} {} {}",
                w.headline,
                w.effective.as_deref().unwrap_or_default(),
                w.description
            ),
            AlertPayload::Tsunami(t) => format!(
                "tsunami {} {} {}",
                t.title,
                t.subtitle.as_deref().unwrap_or_default(),
                t.alarm_time.as_deref().unwrap_or_default()
            ),
            AlertPayload::Other(v) => format!("other {v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Output of the filter stage. `High` only ever comes from a watch-area match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyDecision {
    pub should_notify: bool,
    pub priority: Priority,
}

impl NotifyDecision {
    pub const SKIP: NotifyDecision = NotifyDecision {
        should_notify: false,
        priority: Priority::Normal,
    };

    pub fn notify(priority: Priority) -> Self {
        Self {
            should_notify: true,
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names_match_feed_config() {
        let k: AlertKind = serde_json::from_str("\"weatheralarm\"").unwrap();
        assert_eq!(k, AlertKind::WeatherAlarm);
        let k: AlertKind = serde_json::from_str("\"volcano\"").unwrap();
        assert_eq!(k, AlertKind::Other);
        assert_eq!(serde_json::to_string(&AlertKind::Tsunami).unwrap(), "\"tsunami\"");
    }
}
