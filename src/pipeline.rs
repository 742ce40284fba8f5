// src/pipeline.rs
//! filter → dedup → dispatch for normalized alerts, strictly one at a time.

use chrono::{DateTime, Local};
use metrics::counter;
use std::sync::Arc;

use crate::alert::CanonicalAlert;
use crate::config::Config;
use crate::connection::AlertSink;
use crate::dedup::{derive_identity, SentLedger};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::filter;
use crate::notify::NotifierMux;

/// What happened to one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Filtered,
    Duplicate,
    QuietHours,
    Sent,
}

pub struct Pipeline {
    config: Arc<Config>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Production wiring: channels and ledger from config.
    pub fn from_config(config: Arc<Config>) -> Self {
        let mux = NotifierMux::from_config(&config.notification);
        let ledger = SentLedger::new(config.ledger.path.clone(), config.ledger.capacity);
        Self::new(config, Dispatcher::new(mux, ledger))
    }

    pub fn ledger(&self) -> &SentLedger {
        self.dispatcher.ledger()
    }

    pub async fn handle_alert_at(
        &self,
        alert: &CanonicalAlert,
        now: DateTime<Local>,
    ) -> AlertOutcome {
        tracing::info!(
            target: "pipeline",
            source = %alert.source,
            kind = alert.kind().as_str(),
            "received {}",
            alert.summary()
        );

        let decision = filter::evaluate(alert, &self.config);
        if !decision.should_notify {
            counter!("relay_alerts_filtered_total").increment(1);
            return AlertOutcome::Filtered;
        }

        let identity = derive_identity(alert, now);
        if self.ledger().has(&identity) {
            counter!("relay_alerts_duplicate_total").increment(1);
            tracing::info!(target: "pipeline", %identity, "already sent; skipping");
            return AlertOutcome::Duplicate;
        }

        match self
            .dispatcher
            .dispatch_at(decision, alert, &identity, now)
            .await
        {
            DispatchOutcome::Sent { .. } => AlertOutcome::Sent,
            DispatchOutcome::QuietHours => AlertOutcome::QuietHours,
        }
    }

    pub async fn handle_alerts_at(
        &self,
        alerts: &[CanonicalAlert],
        now: DateTime<Local>,
    ) -> Vec<AlertOutcome> {
        let mut out = Vec::with_capacity(alerts.len());
        for alert in alerts {
            out.push(self.handle_alert_at(alert, now).await);
        }
        out
    }
}

#[async_trait::async_trait]
impl AlertSink for Pipeline {
    async fn on_alerts(&mut self, alerts: Vec<CanonicalAlert>) {
        self.handle_alerts_at(&alerts, Local::now()).await;
    }
}
