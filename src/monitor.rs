use std::time::Duration;

use anyhow::Context;
use tokio::time;
use tracing::{info, warn};

use crate::{
    config::Config,
    error::FeedError,
    message::{delay_notification, resolved_notification},
    notify::Notifier,
    odpt::OdptClient,
    status::{DelayChanges, DelayTracker},
};

pub fn change_messages(changes: &DelayChanges) -> Vec<String> {
    changes
        .new
        .iter()
        .map(delay_notification)
        .chain(changes.resolved.iter().map(resolved_notification))
        .collect()
}

/// Polls train information and pushes each change to the delay channels.
pub struct DelayMonitor {
    client: OdptClient,
    notifier: Notifier,
    tracker: DelayTracker,
}

impl DelayMonitor {
    pub fn new(config: &Config) -> Self {
        Self {
            client: OdptClient::new(config),
            notifier: Notifier::new(config),
            tracker: DelayTracker::default(),
        }
    }

    /// One blocking poll. Returns the number of messages sent.
    ///
    /// A failed fetch leaves the tracker untouched, so nothing is reported
    /// as resolved just because the feed was down.
    pub fn poll(&mut self) -> Result<usize, FeedError> {
        let info = self.client.fetch_train_information()?;
        let changes = self.tracker.update(&info);
        if changes.is_empty() {
            return Ok(0);
        }

        info!(
            "{} new delays, {} resolved",
            changes.new.len(),
            changes.resolved.len()
        );
        let messages = change_messages(&changes);
        let failures = self.notifier.broadcast(&messages);
        if failures > 0 {
            warn!("{failures} notifications failed");
        }

        Ok(messages.len())
    }
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let mut monitor = DelayMonitor::new(config);
    if monitor.notifier.is_empty() {
        warn!("No delay channels configured, changes will only be logged");
    }

    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs.max(1)));
    info!("Polling train information every {}s", config.poll_interval_secs);

    loop {
        interval.tick().await;

        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = monitor.poll();
            (monitor, result)
        })
        .await
        .context("Delay poll task panicked")?;
        monitor = returned;

        if let Err(e) = result {
            warn!("Delay poll failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Disruption;

    fn disruption(railway: &str, status: &str) -> Disruption {
        Disruption {
            railway: railway.to_owned(),
            status: status.to_owned(),
            time_of_origin: None,
        }
    }

    #[test]
    fn new_delays_come_before_resolved() {
        let changes = DelayChanges {
            new: vec![disruption("odpt.Railway:TokyoMetro.Tozai", "遅れています。")],
            resolved: vec![disruption("odpt.Railway:TokyoMetro.Ginza", "遅れています。")],
        };

        let messages = change_messages(&changes);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("🚨 遅延情報\n**東西線**"));
        assert!(messages[1].starts_with("✅ 運行正常化\n**銀座線**"));
    }

    #[test]
    fn poll_without_token_fails_and_keeps_state() {
        let mut monitor = DelayMonitor::new(&Config::default());
        assert!(matches!(monitor.poll(), Err(FeedError::MissingToken)));
    }
}
