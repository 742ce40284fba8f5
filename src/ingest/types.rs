// src/ingest/types.rs
use crate::alert::CanonicalAlert;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatKind {
    Heartbeat,
    Pong,
}

/// What one inbound frame turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// Liveness signal (`heartbeat` / `pong`).
    Heartbeat(HeartbeatKind),
    /// One or more alerts. `initial_all` items come out ordered by source key.
    Alerts(Vec<CanonicalAlert>),
    /// Well-formed but nothing to act on (unknown type, no qualifying items).
    Ignored,
}
