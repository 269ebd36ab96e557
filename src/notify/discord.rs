use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument, trace};

use crate::alerting::CombinedLine;
use crate::config::Discord;
use crate::{Error, Measurement, Result, Severity, Unit};

use super::Notifier;

/// Discord accepts at most this many embeds per message
const MAX_EMBEDS: usize = 10;

/// Discord limit for an embed description
const MAX_DESCRIPTION: usize = 4096;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

fn color(severity: Severity) -> u32 {
    match severity {
        Severity::Error => 15158332, // Red
        Severity::Warn => 15105570,  // Orange
        Severity::Info => 3066993,   // Green
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max - 1).collect();
    format!("{head}…")
}

/// Posts alerts to a Discord webhook.
///
/// The combined view is only posted when it differs from the last one
/// posted, so an unchanged picture does not flood the channel.
#[derive(Debug)]
pub struct DiscordNotifier {
    client: Client,
    discord: Discord,
    last_combined: Mutex<Option<Vec<CombinedLine>>>,
}

impl DiscordNotifier {
    pub fn new(discord: Discord) -> Self {
        Self {
            client: Client::new(),
            discord,
            last_combined: Mutex::new(None),
        }
    }

    pub fn build_status_embed(&self, unit: &Unit, measurement: &Measurement) -> Embed {
        let title = if measurement.status.is_info() {
            format!("✅ {} recovered", measurement.key)
        } else {
            format!(
                "{} {} is {}",
                measurement.status.emoji(),
                measurement.key,
                measurement.status
            )
        };

        let description = match measurement.description.as_deref() {
            Some(description) if !description.is_empty() => {
                format!("**{}**\n{}", measurement.display_value, description)
            }
            _ => format!("**{}**", measurement.display_value),
        };

        Embed {
            title: Some(title),
            description: Some(truncate(&description, MAX_DESCRIPTION)),
            color: Some(color(measurement.status)),
            fields: vec![
                EmbedField {
                    name: "Component".to_string(),
                    value: unit.component.clone(),
                    inline: true,
                },
                EmbedField {
                    name: "Server".to_string(),
                    value: unit.server.clone(),
                    inline: true,
                },
            ],
            footer: Some(EmbedFooter {
                text: format!("{} | {}", unit, measurement.key),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn build_combined_embed(&self, line: &CombinedLine) -> Embed {
        Embed {
            title: Some(line.header.clone()),
            description: Some(truncate(&line.body, MAX_DESCRIPTION)),
            color: Some(color(line.severity)),
            fields: vec![],
            footer: None,
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    /// Whether `lines` is the view that was last delivered
    fn is_posted(&self, lines: &[CombinedLine]) -> bool {
        self.last_combined
            .lock()
            .map(|last| last.as_deref() == Some(lines))
            .unwrap_or(false)
    }

    fn mark_posted(&self, lines: &[CombinedLine]) {
        if let Ok(mut last) = self.last_combined.lock() {
            *last = Some(lines.to_vec());
        }
    }

    async fn post_combined(&self, lines: &[CombinedLine]) -> Result<()> {
        if lines.is_empty() {
            let message = MessageBuilder::new()
                .content("✅ All components are OK")
                .build();
            return self.send_message(&message).await;
        }

        for chunk in lines.chunks(MAX_EMBEDS) {
            let message = chunk
                .iter()
                .fold(MessageBuilder::new(), |builder, line| {
                    builder.add_embed(self.build_combined_embed(line))
                })
                .build();
            self.send_message(&message).await?;
        }

        Ok(())
    }

    #[instrument(skip(self, message))]
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        let response = self
            .client
            .post(&self.discord.url)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Successfully sent Discord message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Delivery {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn alert_about_status(&self, unit: &Unit, measurement: &Measurement) {
        let embed = self.build_status_embed(unit, measurement);
        let mut message_builder = MessageBuilder::new().add_embed(embed);

        if measurement.status == Severity::Error {
            if let Some(user_id) = &self.discord.user_id {
                message_builder = message_builder.content(format!(
                    "🟥 ({} ~ {}) <@{user_id}>",
                    unit.server, measurement.key
                ));
            }
        }

        if let Err(e) = self.send_message(&message_builder.build()).await {
            error!("Failed to send Discord message: {e}");
        }
    }

    async fn combined_status_alerting(&self, lines: &[CombinedLine]) {
        if self.is_posted(lines) {
            trace!("combined view unchanged, not posting");
            return;
        }

        // a view only counts as posted once every chunk was accepted
        match self.post_combined(lines).await {
            Ok(()) => self.mark_posted(lines),
            Err(e) => error!("Failed to post combined view: {e}"),
        }
    }
}
