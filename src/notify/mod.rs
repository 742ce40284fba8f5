// src/notify/mod.rs
pub mod bark;
pub mod desktop;
pub mod quiet_hours;

use futures_util::future::join_all;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::alert::Priority;
use crate::config::NotificationConfig;
use crate::error::RelayError;
pub use bark::BarkNotifier;
pub use desktop::DesktopNotifier;
pub use quiet_hours::QuietHours;

/// One rendered notification, ready for any channel.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    pub priority: Priority,
}

/// A delivery channel. Implementations are best-effort and must not panic.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, ev: &NotificationEvent) -> Result<(), RelayError>;
}

/// Upper bound on one channel's `send` inside the fan-out.
pub const DEFAULT_CHANNEL_DEADLINE: Duration = Duration::from_secs(30);

/// Fans one event out to every configured channel. A failing or stuck channel
/// is logged and never blocks the others; each send is cut off at `deadline`.
#[derive(Clone)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
    deadline: Duration,
}

impl Default for NotifierMux {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            deadline: DEFAULT_CHANNEL_DEADLINE,
        }
    }
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &NotificationConfig) -> Self {
        let mut mux =
            Self::new().with_deadline(Duration::from_secs(cfg.delivery_timeout_secs.max(1)));
        if cfg.enable_desktop {
            mux = mux.with_channel(Arc::new(
                DesktopNotifier::new().with_timeout(cfg.request_timeout_secs),
            ));
        }
        if cfg.enable_bark {
            if cfg.bark_key.trim().is_empty() || cfg.bark_url.trim().is_empty() {
                tracing::warn!(target: "notify", "Bark enabled but bark_url/bark_key missing; channel disabled");
            } else {
                mux = mux.with_channel(Arc::new(
                    BarkNotifier::new(&cfg.bark_url, &cfg.bark_key, &cfg.bark_group)
                        .with_timeout(cfg.request_timeout_secs),
                ));
            }
        }
        if mux.channels.is_empty() {
            tracing::warn!(target: "notify", "no delivery channels enabled; alerts will only be logged");
        }
        mux
    }

    pub fn with_channel(mut self, ch: Arc<dyn Notifier>) -> Self {
        self.channels.push(ch);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to all channels concurrently. Returns how many succeeded within the deadline.
    pub async fn notify(&self, ev: &NotificationEvent) -> usize {
        let deadline = self.deadline;
        let results = join_all(self.channels.iter().map(|ch| async move {
            let name = ch.name();
            let res = match timeout(deadline, ch.send(ev)).await {
                Ok(res) => res,
                Err(_) => Err(RelayError::Delivery {
                    channel: name,
                    reason: format!("no completion within {}s", deadline.as_secs()),
                }),
            };
            (name, res)
        }))
        .await;

        let mut delivered = 0;
        for (name, res) in results {
            match res {
                Ok(()) => {
                    delivered += 1;
                    tracing::debug!(target: "notify", channel = name, title = %ev.title, "delivered");
                }
                Err(e) => {
                    counter!("relay_delivery_errors_total", "channel" => name).increment(1);
                    tracing::warn!(target: "notify", channel = name, error = %e, "delivery failed");
                }
            }
        }
        delivered
    }
}
