// src/ingest/mod.rs
pub mod earthquake;
pub mod types;

use chrono::{DateTime, Local};
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::alert::{AlertKind, AlertPayload, CanonicalAlert, Tsunami, WeatherAlarm};
use crate::config::Config;
use crate::error::RelayError;
use crate::telemetry::ensure_metrics_described;
pub use types::{HeartbeatKind, NormalizedResult};

/// Tsunami feed shape: `{ warningInfo: { title, subtitle }, timeInfo: { alarmDate } }`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsunamiWire {
    warning_info: TsunamiWarningInfo,
    #[serde(default)]
    time_info: Option<TsunamiTimeInfo>,
}

#[derive(Deserialize)]
struct TsunamiWarningInfo {
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsunamiTimeInfo {
    #[serde(default)]
    alarm_date: Option<String>,
}

/// Turns raw feed frames into canonical alerts. Source keys are resolved
/// against the injected config; unknown keys never become alerts.
#[derive(Clone)]
pub struct Normalizer {
    config: Arc<Config>,
}

impl Normalizer {
    pub fn new(config: Arc<Config>) -> Self {
        ensure_metrics_described();
        Self { config }
    }

    pub fn normalize(&self, raw: &[u8]) -> Result<NormalizedResult, RelayError> {
        self.normalize_at(raw, Local::now())
    }

    /// Same as [`normalize`](Self::normalize) with an explicit clock for fallbacks.
    pub fn normalize_at(
        &self,
        raw: &[u8],
        now: DateTime<Local>,
    ) -> Result<NormalizedResult, RelayError> {
        counter!("relay_frames_total").increment(1);

        let frame: Value = serde_json::from_slice(raw).map_err(|e| {
            counter!("relay_parse_errors_total").increment(1);
            RelayError::Parse(format!("{e}; frame: {}", String::from_utf8_lossy(raw)))
        })?;
        let Some(obj) = frame.as_object() else {
            counter!("relay_parse_errors_total").increment(1);
            return Err(RelayError::Parse(format!("frame is not an object: {frame}")));
        };

        let frame_type = obj.get("type").and_then(Value::as_str).unwrap_or_default();
        let result = match frame_type {
            "heartbeat" => NormalizedResult::Heartbeat(HeartbeatKind::Heartbeat),
            "pong" => NormalizedResult::Heartbeat(HeartbeatKind::Pong),
            "initial_all" => {
                // Each sub-object is independent: one bad item never blocks the rest.
                let alerts: Vec<CanonicalAlert> = obj
                    .iter()
                    .filter(|(key, _)| key.as_str() != "type")
                    .filter_map(|(key, value)| {
                        let data = value.get("Data")?;
                        self.normalize_item(key, data, now)
                    })
                    .collect();
                if alerts.is_empty() {
                    NormalizedResult::Ignored
                } else {
                    NormalizedResult::Alerts(alerts)
                }
            }
            "update" => {
                let source = obj.get("source").and_then(Value::as_str);
                let data = obj.get("Data").filter(|d| !d.is_null());
                match (source, data) {
                    (Some(source), Some(data)) => match self.normalize_item(source, data, now) {
                        Some(alert) => NormalizedResult::Alerts(vec![alert]),
                        None => NormalizedResult::Ignored,
                    },
                    _ => {
                        tracing::warn!(target: "ingest", "update frame without source/Data");
                        NormalizedResult::Ignored
                    }
                }
            }
            other => {
                tracing::info!(target: "ingest", frame_type = other, frame = %frame, "unknown frame type");
                NormalizedResult::Ignored
            }
        };

        if let NormalizedResult::Alerts(alerts) = &result {
            counter!("relay_alerts_normalized_total").increment(alerts.len() as u64);
        }
        Ok(result)
    }

    /// Normalize one `Data` payload for `source`. Failures are logged and yield `None`.
    fn normalize_item(
        &self,
        source: &str,
        data: &Value,
        now: DateTime<Local>,
    ) -> Option<CanonicalAlert> {
        let Some(src) = self.config.source(source) else {
            let err = RelayError::config_mismatch(source, "unknown source key");
            tracing::debug!(target: "ingest", error = %err, "dropping item");
            return None;
        };

        let payload = match src.kind {
            AlertKind::Earthquake => {
                earthquake::extract(data, now).map(AlertPayload::Earthquake)
            }
            AlertKind::WeatherAlarm => serde_json::from_value::<WeatherAlarm>(data.clone())
                .map(AlertPayload::WeatherAlarm)
                .map_err(|e| {
                    tracing::warn!(target: "ingest", source, error = %e, "bad weather payload")
                })
                .ok(),
            AlertKind::Tsunami => serde_json::from_value::<TsunamiWire>(data.clone())
                .map(|w| {
                    AlertPayload::Tsunami(Tsunami {
                        title: w.warning_info.title,
                        subtitle: w.warning_info.subtitle,
                        alarm_time: w.time_info.and_then(|t| t.alarm_date),
                    })
                })
                .map_err(|e| {
                    tracing::warn!(target: "ingest", source, error = %e, "bad tsunami payload")
                })
                .ok(),
            // Unknown families: earthquake-shaped extraction as a best effort.
            AlertKind::Other => earthquake::extract(data, now)
                .and_then(|q| serde_json::to_value(q).ok())
                .map(AlertPayload::Other),
        };

        if payload.is_none() {
            tracing::debug!(target: "ingest", source, data = %data, "item dropped: required fields missing");
        }
        payload.map(|payload| CanonicalAlert {
            source: source.to_string(),
            payload,
        })
    }
}
