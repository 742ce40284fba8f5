// src/config/mod.rs
pub mod sources;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::AlertKind;
use crate::dedup::DEFAULT_LEDGER_CAPACITY;
pub use sources::{EarthquakePolicy, SourceConfig, TsunamiPolicy, WeatherPolicy};

pub const ENV_CONFIG_PATH: &str = "ALERT_RELAY_CONFIG";
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/relay.toml", "config.toml"];

fn default_heartbeat_interval_secs() -> u64 {
    30
}
fn default_probe_timeout_secs() -> u64 {
    30
}
fn default_max_missed_heartbeats() -> u32 {
    5
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_connect_timeout_secs() -> u64 {
    15
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("sent_messages.json")
}
fn default_ledger_capacity() -> usize {
    DEFAULT_LEDGER_CAPACITY
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_delivery_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_bark_group() -> String {
    "hazard-alerts".to_string()
}

/// Static configuration, read once at startup and shared as `Arc<Config>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub websocket_url: String,
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default)]
    pub message_types: MessageTypes,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus listener, e.g. "127.0.0.1:9100". Absent = metrics stay in-process.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageTypes {
    #[serde(default)]
    pub enabled: Vec<AlertKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enable_desktop: bool,
    #[serde(default)]
    pub enable_bark: bool,
    #[serde(default)]
    pub bark_url: String,
    #[serde(default)]
    pub bark_key: String,
    #[serde(default = "default_bark_group")]
    pub bark_group: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Per-channel cap on one delivery, retries included.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enable_desktop: false,
            enable_bark: false,
            bark_url: String::new(),
            bark_key: String::new(),
            bark_group: default_bark_group(),
            request_timeout_secs: default_request_timeout_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_max_missed_heartbeats")]
    pub max_missed_heartbeats: u32,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_missed_heartbeats: default_max_missed_heartbeats(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
    #[serde(default = "default_ledger_capacity")]
    pub capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            capacity: default_ledger_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Minimal config for a given endpoint; handy for tools and tests.
    pub fn new(websocket_url: impl Into<String>) -> Self {
        Self {
            websocket_url: websocket_url.into(),
            sources: HashMap::new(),
            message_types: MessageTypes::default(),
            notification: NotificationConfig::default(),
            connection: ConnectionConfig::default(),
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
            metrics_addr: None,
        }
    }

    /// Load from an explicit path. TOML by default, JSON when the extension says so.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = Self::parse(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.sanitized()
    }

    /// Load using env var + fallbacks:
    /// 1) $ALERT_RELAY_CONFIG
    /// 2) config/relay.toml
    /// 3) config.toml
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in DEFAULT_CONFIG_PATHS {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Err(anyhow!(
            "no config found (set {ENV_CONFIG_PATH} or create {})",
            DEFAULT_CONFIG_PATHS.join(" / ")
        ))
    }

    fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        if hint_ext == "json" {
            return Ok(serde_json::from_str(s)?);
        }
        Ok(toml::from_str(s)?)
    }

    fn sanitized(mut self) -> Result<Self> {
        self.websocket_url = self.websocket_url.trim().to_string();
        if self.websocket_url.is_empty() {
            return Err(anyhow!("websocket_url must not be empty"));
        }
        if self.ledger.capacity == 0 {
            self.ledger.capacity = default_ledger_capacity();
        }
        if self.connection.max_missed_heartbeats == 0 {
            self.connection.max_missed_heartbeats = default_max_missed_heartbeats();
        }
        if self.connection.heartbeat_interval_secs == 0 {
            self.connection.heartbeat_interval_secs = default_heartbeat_interval_secs();
        }
        if self.connection.probe_timeout_secs == 0 {
            self.connection.probe_timeout_secs = default_probe_timeout_secs();
        }
        if self.notification.delivery_timeout_secs == 0 {
            self.notification.delivery_timeout_secs = default_delivery_timeout_secs();
        }
        for (key, src) in &self.sources {
            let has_policy = match src.kind {
                AlertKind::Earthquake => src.earthquake.is_some(),
                AlertKind::WeatherAlarm => src.weatheralarm.is_some(),
                AlertKind::Tsunami => src.tsunami.is_some(),
                AlertKind::Other => true,
            };
            if src.enabled && !has_policy {
                tracing::warn!(
                    target: "config",
                    source = %key,
                    kind = ?src.kind,
                    "source enabled without a policy block; its alerts will never notify"
                );
            }
        }
        Ok(self)
    }

    pub fn source(&self, key: &str) -> Option<&SourceConfig> {
        self.sources.get(key)
    }

    pub fn kind_enabled(&self, kind: AlertKind) -> bool {
        self.message_types.enabled.contains(&kind)
    }
}
