// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod alert;
pub mod config;
pub mod connection;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::alert::{AlertKind, AlertPayload, CanonicalAlert, NotifyDecision, Priority};
pub use crate::config::Config;
pub use crate::connection::{ConnectionManager, WsTransport};
pub use crate::error::RelayError;
pub use crate::notify::{NotificationEvent, Notifier, NotifierMux};
pub use crate::pipeline::Pipeline;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Resolve on Ctrl-C or (on Unix) SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Wire the production pipeline and run it until a termination signal.
/// Returns an error only when the connection gave up reconnecting.
pub async fn run(config: Arc<Config>) -> Result<(), RelayError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let pipeline = Pipeline::from_config(config.clone());
    info!(
        url = %config.websocket_url,
        sources = config.sources.len(),
        ledger = %pipeline.ledger().path().display(),
        "hazard alert relay starting"
    );
    ConnectionManager::new(config, WsTransport, pipeline, shutdown_rx)
        .run()
        .await
        .map(|_| ())
}
