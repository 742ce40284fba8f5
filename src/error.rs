// src/error.rs
//! Error taxonomy for the relay pipeline.
//!
//! Only `ReconnectExhausted` stops the process; every other variant is logged
//! at the point it is observed and the pipeline keeps going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed or unexpected frame. The frame is dropped.
    #[error("parse error: {0}")]
    Parse(String),

    /// Unknown source key or missing type-specific policy block. The alert is dropped.
    #[error("config mismatch for source `{source_key}`: {reason}")]
    ConfigMismatch { source_key: String, reason: String },

    /// Connection-level failure. Triggers the reconnect path.
    #[error("transport error: {0}")]
    Transport(String),

    /// One delivery channel failed. The other channels are still attempted.
    #[error("delivery via {channel} failed: {reason}")]
    Delivery {
        channel: &'static str,
        reason: String,
    },

    /// Ledger read/write failure. Callers degrade to "not yet sent".
    #[error("ledger persistence error: {0}")]
    Persistence(String),

    /// Terminal: bounded reconnect attempts used up.
    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}

impl RelayError {
    pub fn config_mismatch(source_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigMismatch {
            source_key: source_key.into(),
            reason: reason.into(),
        }
    }
}
