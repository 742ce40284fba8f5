// src/notify/bark.rs
//! Bark push relay: one HTTP GET per notification, everything in the URL.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use std::time::Duration;

use super::{NotificationEvent, Notifier};
use crate::alert::Priority;
use crate::error::RelayError;

/// Same unreserved set as JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const CHANNEL: &str = "bark";

#[derive(Clone)]
pub struct BarkNotifier {
    base_url: String,
    key: String,
    group: String,
    client: Client,
    timeout: Duration,
    max_attempts: u8,
}

impl BarkNotifier {
    pub fn new(base_url: &str, key: &str, group: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.trim().to_string(),
            group: group.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_attempts: 2,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    /// `{base}/{key}/{title}/{body}?group=..&isArchive=1` plus priority params.
    /// High priority rings through silent mode; normal arrives silently.
    pub fn build_url(&self, ev: &NotificationEvent) -> String {
        let enc = |s: &str| utf8_percent_encode(s, COMPONENT).to_string();
        let priority = match ev.priority {
            Priority::High => "&level=critical&call=1&volume=1.0",
            Priority::Normal => "&sound=silence",
        };
        format!(
            "{}/{}/{}/{}?group={}&isArchive=1{}",
            self.base_url,
            self.key,
            enc(&ev.title),
            enc(&ev.body),
            enc(&self.group),
            priority
        )
    }
}

#[async_trait::async_trait]
impl Notifier for BarkNotifier {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn send(&self, ev: &NotificationEvent) -> Result<(), RelayError> {
        let url = self.build_url(ev);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self.client.get(&url).timeout(self.timeout).send().await;

            let reason = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => {
                        tracing::debug!(target: "notify", status = %rsp.status(), "bark accepted");
                        return Ok(());
                    }
                    Err(e) => format!("HTTP error: {e}"),
                },
                Err(e) => format!("request failed: {e}"),
            };

            if attempt < self.max_attempts {
                tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                continue;
            }
            return Err(RelayError::Delivery {
                channel: CHANNEL,
                reason,
            });
        }
    }
}
