use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::alerting::CombinedLine;
use crate::config::Webhook;
use crate::{Error, Measurement, Result, Unit};

use super::Notifier;

/// Posts alerts as JSON to a generic webhook.
///
/// Single events are sent as `{"type": "status", ...}`, rollups as
/// `{"type": "combined", "lines": [...]}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook: Webhook,
}

impl WebhookNotifier {
    pub fn new(webhook: Webhook) -> Self {
        Self {
            client: Client::new(),
            webhook,
        }
    }

    pub fn status_payload(unit: &Unit, measurement: &Measurement) -> Value {
        let message = if measurement.status.is_info() {
            format!(
                "✅ **{} recovered** on `{}`: {}",
                measurement.key, unit, measurement.display_value
            )
        } else {
            format!(
                "{} **{} is {}** on `{}`: {}",
                measurement.status.emoji(),
                measurement.key,
                measurement.status,
                unit,
                measurement.display_value
            )
        };

        json!({
            "type": "status",
            "message": message,
            "unit": unit,
            "measurement": measurement,
            "timestamp": Utc::now().to_rfc3339()
        })
    }

    pub fn combined_payload(lines: &[CombinedLine]) -> Value {
        json!({
            "type": "combined",
            "lines": lines,
            "timestamp": Utc::now().to_rfc3339()
        })
    }

    #[instrument(skip(self, payload))]
    pub async fn send(&self, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook.url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Delivery {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        info!("Successfully sent webhook alert");
        Ok(())
    }

    async fn send_logged(&self, payload: &Value) {
        if let Err(e) = self.send(payload).await {
            error!("Failed to send webhook alert: {e}");
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn alert_about_status(&self, unit: &Unit, measurement: &Measurement) {
        self.send_logged(&Self::status_payload(unit, measurement)).await;
    }

    async fn combined_status_alerting(&self, lines: &[CombinedLine]) {
        self.send_logged(&Self::combined_payload(lines)).await;
    }
}
