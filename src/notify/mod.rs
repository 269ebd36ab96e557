//! Delivery of alerts to humans
//!
//! The alerter only knows the [`Notifier`] trait. Notifiers own their
//! delivery failures: they log them and never hand them back.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::alerting::CombinedLine;
use crate::config::Alert;
use crate::{Measurement, Unit};

pub mod discord;
pub mod webhook;

#[cfg(test)]
pub(crate) mod recording;

pub use discord::DiscordNotifier;
pub use webhook::WebhookNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// One escalation, change or recovery of a single measurement
    async fn alert_about_status(&self, unit: &Unit, measurement: &Measurement);

    /// The complete set of degraded groups for this cycle
    async fn combined_status_alerting(&self, lines: &[CombinedLine]);
}

/// Build one notifier per configured alert target.
pub fn build_notifiers(alerts: &[Alert]) -> Vec<Arc<dyn Notifier>> {
    alerts
        .iter()
        .map(|alert| -> Arc<dyn Notifier> {
            match alert {
                Alert::Discord(discord) => Arc::new(DiscordNotifier::new(discord.clone())),
                Alert::Webhook(webhook) => Arc::new(WebhookNotifier::new(webhook.clone())),
                Alert::Log => Arc::new(LogNotifier),
            }
        })
        .collect()
}

/// Writes alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn alert_about_status(&self, unit: &Unit, measurement: &Measurement) {
        if measurement.status.is_info() {
            info!(
                "{unit}: {} recovered: {}",
                measurement.key, measurement.display_value
            );
        } else {
            warn!(
                "{unit}: {} is {}: {}",
                measurement.key, measurement.status, measurement.display_value
            );
        }
    }

    async fn combined_status_alerting(&self, lines: &[CombinedLine]) {
        for line in lines {
            debug!("[{}] {}", line.severity, line.header);
        }
    }
}
