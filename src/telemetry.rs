// src/telemetry.rs
//! Logging and metrics wiring.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// One-time metrics registration (so series show up on the exporter).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_frames_total", "Inbound frames handed to the normalizer.");
        describe_counter!(
            "relay_alerts_normalized_total",
            "Canonical alerts produced by the normalizer."
        );
        describe_counter!("relay_parse_errors_total", "Frames that failed to parse.");
        describe_counter!(
            "relay_alerts_filtered_total",
            "Alerts rejected by the per-source policy."
        );
        describe_counter!(
            "relay_alerts_duplicate_total",
            "Alerts suppressed because their identity was already sent."
        );
        describe_counter!(
            "relay_notifications_sent_total",
            "Alerts fanned out to the delivery channels."
        );
        describe_counter!(
            "relay_notifications_quiet_hours_total",
            "Normal-priority alerts held back by quiet hours."
        );
        describe_counter!(
            "relay_delivery_errors_total",
            "Per-channel delivery failures."
        );
        describe_counter!("relay_reconnects_total", "Connection attempts after the first one.");
        describe_gauge!(
            "relay_missed_heartbeats",
            "Consecutive unanswered liveness probes."
        );
    });
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", cfg.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let res = match cfg.format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Serve Prometheus metrics on `addr`. Must run inside the tokio runtime.
pub fn install_metrics_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
