//! Sends one sample notification per priority through the configured channels
//! (bypasses filtering, dedup and quiet hours). Useful to check Bark/desktop setup.

use hazard_alert_relay::{telemetry, Config, NotificationEvent, NotifierMux, Priority};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::load_default()?;
    telemetry::init_tracing(&config.logging);

    let mux = NotifierMux::from_config(&config.notification);
    println!("channels: {:?}", mux.channel_names());

    for priority in [Priority::Normal, Priority::High] {
        let ev = NotificationEvent {
            title: format!("📢 Test alert ({priority:?})"),
            body: "hazard-alert-relay notify demo".into(),
            priority,
        };
        let delivered = mux.notify(&ev).await;
        println!("{priority:?}: delivered via {delivered} channel(s)");
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    println!("notify-demo done");
    Ok(())
}
