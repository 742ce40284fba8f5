// src/connection/lifecycle.rs
//! Connection lifecycle as a pure state machine.
//!
//! `Lifecycle::handle` maps one event to the actions the driver must perform.
//! No sockets, no timers: the driver owns those and feeds their outcomes back
//! in as events, so every transition is testable with synthetic input.

use std::time::Duration;

use crate::config::ConnectionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatHealth {
    /// No unanswered probe since the last reset.
    Ok,
    /// At least one probe timed out.
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(HeartbeatHealth),
    Reconnecting,
    /// Terminal, after explicit shutdown.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    Opened,
    /// `heartbeat` / `pong` frame received.
    LivenessAck,
    Closed(String),
    Failed(String),
    HeartbeatTick,
    ProbeTimeout,
    ReconnectDue,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Connect,
    Close,
    SendProbe,
    StartHeartbeat,
    /// Also drops any pending probe timeout.
    StopHeartbeat,
    ArmProbeTimeout,
    CancelProbeTimeout,
    ScheduleReconnect(Duration),
    CancelReconnect,
    GiveUp { attempts: u32 },
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    pub max_missed_heartbeats: u32,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from(&ConnectionConfig::default())
    }
}

impl From<&ConnectionConfig> for LifecycleSettings {
    fn from(c: &ConnectionConfig) -> Self {
        Self {
            max_missed_heartbeats: c.max_missed_heartbeats.max(1),
            reconnect_delay: c.reconnect_delay(),
            max_reconnect_attempts: c.max_reconnect_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
    settings: LifecycleSettings,
    reconnect_attempts: u32,
    missed_heartbeats: u32,
    probe_pending: bool,
}

impl Lifecycle {
    pub fn new(settings: LifecycleSettings) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            settings,
            reconnect_attempts: 0,
            missed_heartbeats: 0,
            probe_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn missed_heartbeats(&self) -> u32 {
        self.missed_heartbeats
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> Vec<Action> {
        use ConnectionState as S;
        use LifecycleEvent as E;

        if self.state == S::Closed {
            return Vec::new();
        }

        match event {
            E::Shutdown => {
                self.state = S::Closed;
                self.probe_pending = false;
                vec![
                    Action::StopHeartbeat,
                    Action::CancelReconnect,
                    Action::Close,
                    Action::Stop,
                ]
            }
            E::Start if self.state == S::Disconnected => {
                self.state = S::Connecting;
                vec![Action::Connect]
            }
            E::Opened if self.state == S::Connecting => {
                self.state = S::Connected(HeartbeatHealth::Ok);
                self.reconnect_attempts = 0;
                self.missed_heartbeats = 0;
                self.probe_pending = false;
                vec![Action::StartHeartbeat]
            }
            E::LivenessAck => {
                // Any acknowledgement resets liveness, whatever the sub-state.
                self.missed_heartbeats = 0;
                self.probe_pending = false;
                if let S::Connected(_) = self.state {
                    self.state = S::Connected(HeartbeatHealth::Ok);
                }
                vec![Action::CancelProbeTimeout]
            }
            E::HeartbeatTick if matches!(self.state, S::Connected(_)) => {
                let mut actions = Vec::new();
                if !self.probe_pending {
                    self.probe_pending = true;
                    actions.push(Action::ArmProbeTimeout);
                }
                // Probe only once something went unanswered; otherwise the
                // feed's own heartbeats already prove liveness.
                if self.missed_heartbeats > 0 {
                    actions.push(Action::SendProbe);
                }
                actions
            }
            E::ProbeTimeout if matches!(self.state, S::Connected(_)) && self.probe_pending => {
                self.probe_pending = false;
                self.missed_heartbeats += 1;
                self.state = S::Connected(HeartbeatHealth::Degraded);
                if self.missed_heartbeats >= self.settings.max_missed_heartbeats {
                    // Forced reconnect: immediate, outside the close/error retry budget.
                    self.state = S::Connecting;
                    vec![Action::StopHeartbeat, Action::Close, Action::Connect]
                } else {
                    Vec::new()
                }
            }
            E::Closed(_) | E::Failed(_)
                if matches!(self.state, S::Connecting | S::Connected(_)) =>
            {
                self.probe_pending = false;
                let mut actions = vec![Action::StopHeartbeat];
                if self.reconnect_attempts < self.settings.max_reconnect_attempts {
                    self.reconnect_attempts += 1;
                    self.state = S::Reconnecting;
                    actions.push(Action::ScheduleReconnect(self.settings.reconnect_delay));
                } else {
                    self.state = S::Disconnected;
                    actions.push(Action::GiveUp {
                        attempts: self.reconnect_attempts,
                    });
                }
                actions
            }
            E::ReconnectDue if self.state == S::Reconnecting => {
                self.state = S::Connecting;
                vec![Action::Connect]
            }
            _ => Vec::new(),
        }
    }
}
