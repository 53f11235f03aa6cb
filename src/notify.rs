use std::{collections::BTreeMap, time::Duration};

use reqwest::blocking;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;

/// Chat messages longer than this are rejected by the webhook.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

fn truncate(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}

/// Sends chat messages to every configured delay channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    channels: BTreeMap<String, String>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(config: &Config) -> Self {
        Self {
            channels: config.delay_channels.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Posts every message to every channel, returning how many posts failed.
    /// A failing channel doesn't stop delivery to the others.
    pub fn broadcast(&self, messages: &[String]) -> usize {
        let client = match blocking::Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to create HTTP client: {e}");
                return messages.len() * self.channels.len();
            }
        };

        let mut failures = 0;
        for (guild, webhook) in &self.channels {
            for message in messages {
                let body = WebhookMessage {
                    content: truncate(message, MAX_CONTENT_CHARS),
                };
                let result = client
                    .post(webhook)
                    .json(&body)
                    .send()
                    .and_then(|r| r.error_for_status());

                if let Err(e) = result {
                    warn!("Failed to notify guild {guild}: {e}");
                    failures += 1;
                }
            }
            info!("Sent {} notifications to guild {guild}", messages.len());
        }

        failures
    }
}
