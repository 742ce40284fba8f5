// src/dispatch.rs
//! Notification policy dispatcher: quiet-hours gate, message rendering,
//! channel fan-out, then the ledger write.

use chrono::{DateTime, Local};
use metrics::counter;

use crate::alert::{AlertPayload, CanonicalAlert, NotifyDecision, Priority};
use crate::dedup::{AlertIdentity, SentLedger};
use crate::ingest::earthquake::LOCAL_TIME_FORMAT;
use crate::notify::{NotificationEvent, NotifierMux, QuietHours};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Fanned out (`delivered` channels succeeded) and recorded in the ledger.
    Sent { delivered: usize },
    /// Normal priority outside the delivery window. Not recorded.
    QuietHours,
}

/// Title/body pair for `alert`, type-specific.
pub fn render(alert: &CanonicalAlert, now: DateTime<Local>) -> (String, String) {
    let src = &alert.source;
    match &alert.payload {
        AlertPayload::Earthquake(q) => (
            format!("⚠️ Earthquake: {} ({src})", q.address),
            format!(
                "M{}\nDepth: {}\nTime: {}\nLocation: {}, {}",
                q.magnitude, q.depth, q.time, q.latitude, q.longitude
            ),
        ),
        AlertPayload::WeatherAlarm(w) => (
            format!("🌤️ Weather alert: {} ({src})", w.headline),
            w.description.clone(),
        ),
        AlertPayload::Tsunami(t) => (
            format!("🌊 Tsunami warning: {} ({src})", t.title),
            format!(
                "{}\nTime: {}",
                t.subtitle.as_deref().unwrap_or_default(),
                t.alarm_time
                    .clone()
                    .unwrap_or_else(|| now.format(LOCAL_TIME_FORMAT).to_string())
            ),
        ),
        AlertPayload::Other(v) => (format!("📢 Alert: {src}"), v.to_string()),
    }
}

pub struct Dispatcher {
    mux: NotifierMux,
    ledger: SentLedger,
    quiet_hours: QuietHours,
}

impl Dispatcher {
    pub fn new(mux: NotifierMux, ledger: SentLedger) -> Self {
        Self {
            mux,
            ledger,
            quiet_hours: QuietHours,
        }
    }

    pub fn ledger(&self) -> &SentLedger {
        &self.ledger
    }

    /// Dispatch an alert that already passed filtering and dedup.
    ///
    /// The identity is recorded before any channel runs. Channel failures are
    /// logged by the mux, and each channel is cut off at the mux deadline, so
    /// this returns in bounded time.
    pub async fn dispatch_at(
        &self,
        decision: NotifyDecision,
        alert: &CanonicalAlert,
        identity: &AlertIdentity,
        now: DateTime<Local>,
    ) -> DispatchOutcome {
        if !self.quiet_hours.allows(decision.priority, now) {
            counter!("relay_notifications_quiet_hours_total").increment(1);
            tracing::info!(target: "notify", %identity, source = %alert.source, "quiet hours; notification skipped");
            return DispatchOutcome::QuietHours;
        }

        let (title, body) = render(alert, now);

        // Marked sent before the fan-out: delivery outcome never gates the ledger.
        if let Err(e) = self.ledger.record(identity) {
            tracing::warn!(target: "dedup", %identity, error = %e, "failed to record sent alert");
        }

        tracing::info!(
            target: "notify",
            priority = ?decision.priority,
            high = decision.priority == Priority::High,
            %title,
            "dispatching notification"
        );
        let ev = NotificationEvent {
            title,
            body,
            priority: decision.priority,
        };
        let delivered = self.mux.notify(&ev).await;
        counter!("relay_notifications_sent_total").increment(1);
        DispatchOutcome::Sent { delivered }
    }
}
