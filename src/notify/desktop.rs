// src/notify/desktop.rs
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::{NotificationEvent, Notifier};
use crate::alert::Priority;
use crate::error::RelayError;

const CHANNEL: &str = "desktop";

/// Local desktop popup via the platform notifier (`notify-send` / `osascript`).
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    timeout: Duration,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    fn command(ev: &NotificationEvent) -> Option<Command> {
        if cfg!(target_os = "linux") {
            let urgency = match ev.priority {
                Priority::High => "critical",
                Priority::Normal => "normal",
            };
            let mut cmd = Command::new("notify-send");
            cmd.args(["-u", urgency, "-a", "hazard-alert-relay"])
                .arg(&ev.title)
                .arg(&ev.body);
            Some(cmd)
        } else if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"{}",
                applescript_escape(&ev.body),
                applescript_escape(&ev.title),
                if ev.priority == Priority::High {
                    " sound name \"Sosumi\""
                } else {
                    ""
                }
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            Some(cmd)
        } else {
            None
        }
    }
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait::async_trait]
impl Notifier for DesktopNotifier {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn send(&self, ev: &NotificationEvent) -> Result<(), RelayError> {
        let Some(cmd) = Self::command(ev) else {
            tracing::debug!(target: "notify", "desktop notifications unsupported on this platform");
            return Ok(());
        };
        run_bounded(cmd, self.timeout).await
    }
}

/// Run the notifier command, killing it if it outlives `limit`.
async fn run_bounded(mut cmd: Command, limit: Duration) -> Result<(), RelayError> {
    let fail = |reason: String| RelayError::Delivery {
        channel: CHANNEL,
        reason,
    };
    cmd.kill_on_drop(true);
    let status = match timeout(limit, cmd.status()).await {
        Ok(res) => res.map_err(|e| fail(format!("spawn notifier: {e}")))?,
        Err(_) => {
            let secs = limit.as_secs_f32();
            return Err(fail(format!("notifier still running after {secs}s")));
        }
    };
    if status.success() {
        Ok(())
    } else {
        Err(fail(format!("notifier exited with {status}")))
    }
}
