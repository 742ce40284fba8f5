// tests/dispatch_quiet_hours.rs
mod common;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use common::RecordingNotifier;
use hazard_alert_relay::alert::Earthquake;
use hazard_alert_relay::dedup::{derive_identity, AlertIdentity, SentLedger};
use hazard_alert_relay::dispatch::{DispatchOutcome, Dispatcher};
use hazard_alert_relay::{
    AlertPayload, CanonicalAlert, NotificationEvent, Notifier, NotifierMux, NotifyDecision,
    Priority, RelayError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn at(h: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 9, 6, h, 0, 0).unwrap()
}

fn alert() -> CanonicalAlert {
    CanonicalAlert {
        source: "usgs".into(),
        payload: AlertPayload::Earthquake(Earthquake {
            id: "us7000".into(),
            address: "Southern Alaska".into(),
            magnitude: 5.6,
            depth: "35".into(),
            time: "1757152800000".into(),
            latitude: "59.8".into(),
            longitude: "-152.7".into(),
        }),
    }
}

fn dispatcher(dir: &tempfile::TempDir, rec: &RecordingNotifier) -> Dispatcher {
    let mux = NotifierMux::new().with_channel(Arc::new(rec.clone()));
    Dispatcher::new(mux, SentLedger::new(dir.path().join("sent.json"), 1000))
}

#[tokio::test]
async fn normal_priority_at_21_is_held_back_without_ledger_write() {
    let dir = tempfile::tempdir().unwrap();
    let rec = RecordingNotifier::default();
    let d = dispatcher(&dir, &rec);
    let a = alert();
    let id = derive_identity(&a, at(21));

    let out = d
        .dispatch_at(NotifyDecision::notify(Priority::Normal), &a, &id, at(21))
        .await;
    assert_eq!(out, DispatchOutcome::QuietHours);
    assert_eq!(rec.count(), 0);
    assert!(d.ledger().load().unwrap().is_empty());
}

#[tokio::test]
async fn normal_priority_at_10_dispatches_and_records() {
    let dir = tempfile::tempdir().unwrap();
    let rec = RecordingNotifier::default();
    let d = dispatcher(&dir, &rec);
    let a = alert();
    let id = derive_identity(&a, at(10));

    let out = d
        .dispatch_at(NotifyDecision::notify(Priority::Normal), &a, &id, at(10))
        .await;
    assert_eq!(out, DispatchOutcome::Sent { delivered: 1 });
    let events = rec.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].priority, Priority::Normal);
    assert_eq!(events[0].title, "⚠️ Earthquake: Southern Alaska (usgs)");
    assert!(d.ledger().has(&id));
}

#[tokio::test]
async fn high_priority_dispatches_at_2am() {
    let dir = tempfile::tempdir().unwrap();
    let rec = RecordingNotifier::default();
    let d = dispatcher(&dir, &rec);
    let a = alert();
    let id = derive_identity(&a, at(2));

    let out = d
        .dispatch_at(NotifyDecision::notify(Priority::High), &a, &id, at(2))
        .await;
    assert_eq!(out, DispatchOutcome::Sent { delivered: 1 });
    assert_eq!(rec.count(), 1);
    assert!(d.ledger().has(&id));
}

#[tokio::test]
async fn failed_channel_still_records_identity() {
    let dir = tempfile::tempdir().unwrap();
    let bad = RecordingNotifier::failing();
    let good = RecordingNotifier::default();
    let mux = NotifierMux::new()
        .with_channel(Arc::new(bad.clone()))
        .with_channel(Arc::new(good.clone()));
    let d = Dispatcher::new(mux, SentLedger::new(dir.path().join("sent.json"), 1000));
    let a = alert();
    let id = derive_identity(&a, at(12));

    let out = d
        .dispatch_at(NotifyDecision::notify(Priority::High), &a, &id, at(12))
        .await;
    assert_eq!(out, DispatchOutcome::Sent { delivered: 1 });
    assert_eq!(bad.count(), 1);
    assert_eq!(good.count(), 1);
    assert!(d.ledger().has(&id));
}

/// Channel that never completes.
struct Hung;

#[async_trait]
impl Notifier for Hung {
    fn name(&self) -> &'static str {
        "hung"
    }

    async fn send(&self, _ev: &NotificationEvent) -> Result<(), RelayError> {
        std::future::pending().await
    }
}

/// Channel that notes whether the identity was already in the ledger when it ran.
struct LedgerCheck {
    ledger: SentLedger,
    id: AlertIdentity,
    recorded_first: Arc<AtomicBool>,
}

#[async_trait]
impl Notifier for LedgerCheck {
    fn name(&self) -> &'static str {
        "ledger-check"
    }

    async fn send(&self, _ev: &NotificationEvent) -> Result<(), RelayError> {
        self.recorded_first
            .store(self.ledger.has(&self.id), Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn hung_channel_cannot_stall_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let good = RecordingNotifier::default();
    let mux = NotifierMux::new()
        .with_deadline(Duration::from_secs(30))
        .with_channel(Arc::new(Hung))
        .with_channel(Arc::new(good.clone()));
    let d = Dispatcher::new(mux, SentLedger::new(dir.path().join("sent.json"), 1000));
    let a = alert();
    let id = derive_identity(&a, at(12));

    let out = tokio::time::timeout(
        Duration::from_secs(3600),
        d.dispatch_at(NotifyDecision::notify(Priority::High), &a, &id, at(12)),
    )
    .await
    .expect("dispatch must finish despite a hung channel");
    assert_eq!(out, DispatchOutcome::Sent { delivered: 1 });
    assert_eq!(good.count(), 1);
    assert!(d.ledger().has(&id));
}

#[tokio::test]
async fn identity_is_recorded_before_channels_run() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = SentLedger::new(dir.path().join("sent.json"), 1000);
    let a = alert();
    let id = derive_identity(&a, at(12));
    let recorded_first = Arc::new(AtomicBool::new(false));
    let check = LedgerCheck {
        ledger: ledger.clone(),
        id: id.clone(),
        recorded_first: recorded_first.clone(),
    };
    let d = Dispatcher::new(NotifierMux::new().with_channel(Arc::new(check)), ledger);

    d.dispatch_at(NotifyDecision::notify(Priority::High), &a, &id, at(12))
        .await;
    assert!(recorded_first.load(Ordering::SeqCst));
}

#[tokio::test]
async fn ledger_write_failure_still_dispatches() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a dir").unwrap();
    let rec = RecordingNotifier::default();
    let mux = NotifierMux::new().with_channel(Arc::new(rec.clone()));
    let d = Dispatcher::new(mux, SentLedger::new(blocker.join("sent.json"), 1000));
    let a = alert();
    let id = derive_identity(&a, at(12));

    let out = d
        .dispatch_at(NotifyDecision::notify(Priority::High), &a, &id, at(12))
        .await;
    assert_eq!(out, DispatchOutcome::Sent { delivered: 1 });
    assert_eq!(rec.count(), 1);
    assert!(!d.ledger().has(&id));
}
