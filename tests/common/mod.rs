// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use hazard_alert_relay::alert::AlertKind;
use hazard_alert_relay::config::{SourceConfig, TsunamiPolicy, WeatherPolicy};
use hazard_alert_relay::{Config, NotificationEvent, Notifier, RelayError};
use std::sync::{Arc, Mutex};

/// Notifier double that records every event it receives.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<NotificationEvent>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Arc::default(),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn take(&self) -> Vec<NotificationEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, ev: &NotificationEvent) -> Result<(), RelayError> {
        self.events.lock().unwrap().push(ev.clone());
        if self.fail {
            return Err(RelayError::Delivery {
                channel: "recording",
                reason: "configured to fail".into(),
            });
        }
        Ok(())
    }
}

/// Config with one source per alert family, all enabled.
///
/// - `cenc`: earthquake, M>=4.0, watch areas 四川/云南
/// - `usgs`: earthquake, M>=5.0, no watch areas
/// - `cma`: weather, levels 红色/橙色, type 暴雨, area 北京
/// - `jma`: tsunami, level 大津波警報, area 宮城
/// - `misc`: other
pub fn test_config() -> Config {
    let mut cfg = Config::new("ws://feed.test/ws");
    cfg.message_types.enabled = vec![
        AlertKind::Earthquake,
        AlertKind::WeatherAlarm,
        AlertKind::Tsunami,
    ];
    cfg.sources
        .insert("cenc".into(), SourceConfig::earthquake(4.0, &["四川", "云南"]));
    cfg.sources.insert("usgs".into(), SourceConfig::earthquake(5.0, &[]));
    cfg.sources.insert(
        "cma".into(),
        SourceConfig {
            enabled: true,
            kind: AlertKind::WeatherAlarm,
            earthquake: None,
            weatheralarm: Some(WeatherPolicy {
                levels: vec!["红色".into(), "橙色".into()],
                alert_types: vec!["暴雨".into()],
                areas: vec!["北京".into()],
            }),
            tsunami: None,
        },
    );
    cfg.sources.insert(
        "jma".into(),
        SourceConfig {
            enabled: true,
            kind: AlertKind::Tsunami,
            earthquake: None,
            weatheralarm: None,
            tsunami: Some(TsunamiPolicy {
                levels: vec!["大津波警報".into()],
                areas: vec!["宮城".into()],
            }),
        },
    );
    cfg.sources.insert(
        "misc".into(),
        SourceConfig {
            enabled: true,
            kind: AlertKind::Other,
            earthquake: None,
            weatheralarm: None,
            tsunami: None,
        },
    );
    cfg
}
