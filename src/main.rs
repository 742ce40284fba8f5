//! Hazard alert relay binary entrypoint.
//! Loads config, initializes tracing/metrics and runs the connection manager
//! until SIGINT/SIGTERM.

use anyhow::Context;
use std::sync::Arc;

use hazard_alert_relay::{telemetry, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let config = Config::load_default().context("loading relay config")?;
    telemetry::init_tracing(&config.logging);

    if let Some(addr) = config.metrics_addr {
        telemetry::install_metrics_exporter(addr)?;
    }

    hazard_alert_relay::run(Arc::new(config))
        .await
        .context("connection manager stopped")?;
    Ok(())
}
