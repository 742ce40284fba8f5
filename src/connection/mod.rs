// src/connection/mod.rs
//! Connection lifecycle manager: owns the one active streaming connection,
//! its heartbeat timers and the reconnect schedule.
//!
//! Every input (frame, timer, socket event, shutdown) is funneled through a
//! single `select!` loop and handled to completion before the next one is
//! taken, so alert batches never overlap.

pub mod lifecycle;
pub mod transport;

use metrics::{counter, gauge};
use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep_until, timeout, Instant, Interval, MissedTickBehavior};

use crate::alert::CanonicalAlert;
use crate::config::Config;
use crate::error::RelayError;
use crate::ingest::{NormalizedResult, Normalizer};
pub use lifecycle::{
    Action, ConnectionState, HeartbeatHealth, Lifecycle, LifecycleEvent, LifecycleSettings,
};
pub use transport::{Connection, Transport, WsConnection, WsTransport, PING_FRAME};

/// Receives normalized alert batches, one batch at a time.
#[async_trait::async_trait]
pub trait AlertSink: Send {
    async fn on_alerts(&mut self, alerts: Vec<CanonicalAlert>);
}

pub struct ConnectionManager<T: Transport, S: AlertSink> {
    url: String,
    transport: T,
    normalizer: Normalizer,
    sink: S,
    lifecycle: Lifecycle,
    heartbeat_interval: Duration,
    probe_timeout: Duration,
    connect_timeout: Duration,
    shutdown: watch::Receiver<bool>,

    conn: Option<T::Conn>,
    heartbeat: Option<Interval>,
    probe_deadline: Option<Instant>,
    reconnect_at: Option<Instant>,
    pending: VecDeque<LifecycleEvent>,
    connect_attempts: u64,
}

async fn recv_frame<C: Connection>(conn: &mut Option<C>) -> Option<Result<String, RelayError>> {
    match conn {
        Some(c) => c.recv().await,
        None => pending().await,
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(iv) => {
            iv.tick().await;
        }
        None => pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(t) => sleep_until(t).await,
        None => pending().await,
    }
}

impl<T: Transport, S: AlertSink> ConnectionManager<T, S> {
    pub fn new(config: Arc<Config>, transport: T, sink: S, shutdown: watch::Receiver<bool>) -> Self {
        let c = &config.connection;
        Self {
            url: config.websocket_url.clone(),
            transport,
            normalizer: Normalizer::new(config.clone()),
            sink,
            lifecycle: Lifecycle::new(LifecycleSettings::from(c)),
            heartbeat_interval: c.heartbeat_interval(),
            probe_timeout: c.probe_timeout(),
            connect_timeout: c.connect_timeout(),
            shutdown,
            conn: None,
            heartbeat: None,
            probe_deadline: None,
            reconnect_at: None,
            pending: VecDeque::new(),
            connect_attempts: 0,
        }
    }

    /// Run until shutdown (`Ok`) or until reconnect attempts are exhausted.
    pub async fn run(mut self) -> Result<S, RelayError> {
        self.pending.push_back(LifecycleEvent::Start);
        loop {
            let event = match self.pending.pop_front() {
                Some(ev) => ev,
                None => self.next_event().await,
            };

            let before = self.lifecycle.state();
            let actions = self.lifecycle.handle(event);
            let after = self.lifecycle.state();
            if before != after {
                tracing::info!(target: "connection", from = ?before, to = ?after, "state change");
            }
            gauge!("relay_missed_heartbeats").set(self.lifecycle.missed_heartbeats() as f64);

            for action in actions {
                match action {
                    Action::Stop => {
                        tracing::info!(target: "connection", "connection manager stopped");
                        return Ok(self.sink);
                    }
                    Action::GiveUp { attempts } => {
                        tracing::error!(
                            target: "connection",
                            attempts,
                            "reconnect attempts exhausted; giving up (restart required)"
                        );
                        return Err(RelayError::ReconnectExhausted { attempts });
                    }
                    other => self.apply(other).await,
                }
            }
        }
    }

    async fn next_event(&mut self) -> LifecycleEvent {
        loop {
            if *self.shutdown.borrow() {
                return LifecycleEvent::Shutdown;
            }
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    // A dropped sender can never signal again; stop as well.
                    if changed.is_err() || *self.shutdown.borrow() {
                        return LifecycleEvent::Shutdown;
                    }
                }
                frame = recv_frame(&mut self.conn) => match frame {
                    Some(Ok(text)) => {
                        if let Some(ev) = self.on_frame(&text).await {
                            return ev;
                        }
                    }
                    Some(Err(e)) => {
                        self.conn = None;
                        tracing::warn!(target: "connection", error = %e, "connection error");
                        return LifecycleEvent::Failed(e.to_string());
                    }
                    None => {
                        self.conn = None;
                        tracing::warn!(target: "connection", "connection closed");
                        return LifecycleEvent::Closed("stream ended".into());
                    }
                },
                _ = sleep_until_opt(self.probe_deadline) => {
                    self.probe_deadline = None;
                    tracing::warn!(
                        target: "connection",
                        missed = self.lifecycle.missed_heartbeats() + 1,
                        "no liveness acknowledgement before timeout"
                    );
                    return LifecycleEvent::ProbeTimeout;
                }
                _ = tick(&mut self.heartbeat) => return LifecycleEvent::HeartbeatTick,
                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    return LifecycleEvent::ReconnectDue;
                }
            }
        }
    }

    /// Normalize one frame. Liveness frames become lifecycle events; alerts go
    /// to the sink and are fully handled before this returns.
    async fn on_frame(&mut self, text: &str) -> Option<LifecycleEvent> {
        match self.normalizer.normalize(text.as_bytes()) {
            Ok(NormalizedResult::Heartbeat(kind)) => {
                tracing::debug!(target: "connection", ?kind, "liveness frame");
                Some(LifecycleEvent::LivenessAck)
            }
            Ok(NormalizedResult::Alerts(alerts)) => {
                self.sink.on_alerts(alerts).await;
                None
            }
            Ok(NormalizedResult::Ignored) => None,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "frame dropped");
                None
            }
        }
    }

    async fn apply(&mut self, action: Action) {
        match action {
            Action::Connect => {
                if let Some(mut old) = self.conn.take() {
                    old.close().await;
                }
                if self.connect_attempts > 0 {
                    counter!("relay_reconnects_total").increment(1);
                }
                self.connect_attempts += 1;
                tracing::info!(target: "connection", url = %self.url, "connecting");
                let ev = match timeout(self.connect_timeout, self.transport.connect(&self.url)).await
                {
                    Ok(Ok(conn)) => {
                        self.conn = Some(conn);
                        tracing::info!(target: "connection", "connection established");
                        LifecycleEvent::Opened
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(target: "connection", error = %e, "connect failed");
                        LifecycleEvent::Failed(e.to_string())
                    }
                    Err(_) => {
                        tracing::warn!(target: "connection", "connect timed out");
                        LifecycleEvent::Failed("connect timed out".into())
                    }
                };
                self.pending.push_back(ev);
            }
            Action::Close => {
                if let Some(mut c) = self.conn.take() {
                    c.close().await;
                }
            }
            Action::SendProbe => {
                if let Some(c) = self.conn.as_mut() {
                    tracing::debug!(
                        target: "connection",
                        missed = self.lifecycle.missed_heartbeats(),
                        "sending ping"
                    );
                    if let Err(e) = c.send(PING_FRAME.to_string()).await {
                        // The armed timeout still counts this as a miss.
                        tracing::warn!(target: "connection", error = %e, "ping failed");
                    }
                }
            }
            Action::StartHeartbeat => {
                let mut iv = interval_at(
                    Instant::now() + self.heartbeat_interval,
                    self.heartbeat_interval,
                );
                iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.heartbeat = Some(iv);
                self.probe_deadline = None;
            }
            Action::StopHeartbeat => {
                self.heartbeat = None;
                self.probe_deadline = None;
            }
            Action::ArmProbeTimeout => {
                self.probe_deadline = Some(Instant::now() + self.probe_timeout);
            }
            Action::CancelProbeTimeout => self.probe_deadline = None,
            Action::ScheduleReconnect(delay) => {
                tracing::info!(
                    target: "connection",
                    attempt = self.lifecycle.reconnect_attempts(),
                    delay_secs = delay.as_secs(),
                    "reconnect scheduled"
                );
                self.reconnect_at = Some(Instant::now() + delay);
            }
            Action::CancelReconnect => self.reconnect_at = None,
            // Terminal actions are handled by `run`.
            Action::GiveUp { .. } | Action::Stop => {}
        }
    }
}
