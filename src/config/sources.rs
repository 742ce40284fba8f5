// src/config/sources.rs
use serde::{Deserialize, Serialize};

use crate::alert::AlertKind;

/// Per-feed settings, keyed by source key in `Config::sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    #[serde(default)]
    pub earthquake: Option<EarthquakePolicy>,
    #[serde(default)]
    pub weatheralarm: Option<WeatherPolicy>,
    #[serde(default)]
    pub tsunami: Option<TsunamiPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarthquakePolicy {
    pub min_magnitude: f64,
    /// Watch areas. Empty means "everywhere, normal priority".
    #[serde(default)]
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherPolicy {
    /// Severity keywords, e.g. "红色", "Red".
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub alert_types: Vec<String>,
    #[serde(default)]
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsunamiPolicy {
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub areas: Vec<String>,
}

impl SourceConfig {
    pub fn earthquake(min_magnitude: f64, areas: &[&str]) -> Self {
        Self {
            enabled: true,
            kind: AlertKind::Earthquake,
            earthquake: Some(EarthquakePolicy {
                min_magnitude,
                areas: areas.iter().map(|s| s.to_string()).collect(),
            }),
            weatheralarm: None,
            tsunami: None,
        }
    }
}
