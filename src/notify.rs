use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::{Alert, Discord, Webhook};
use crate::region::MonitorRegion;
use crate::threshold::Severity;

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
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// A severity transition worth telling someone about
#[derive(Debug, Clone)]
pub struct SeverityChange {
    pub previous: Option<Severity>,
    pub current: Severity,
    pub percentage: f64,
    pub region: Option<MonitorRegion>,
    pub timestamp: DateTime<Utc>,
}

impl SeverityChange {
    fn region_display(&self) -> String {
        self.region
            .map(|region| {
                format!(
                    "{}x{} at [{}]",
                    region.width(),
                    region.height(),
                    region.anchor
                )
            })
            .unwrap_or_else(|| "unknown region".to_string())
    }
}

/// Delivers severity changes to the configured alert target
#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    alert: Alert,
}

impl Notifier {
    pub fn new(alert: Alert) -> Self {
        Self {
            client: Client::new(),
            alert,
        }
    }

    #[instrument(skip_all, fields(severity = %change.current))]
    pub async fn notify(&self, change: &SeverityChange) {
        match &self.alert {
            Alert::Discord(discord) => {
                let message = build_discord_message(discord, change);
                self.send_discord(discord, &message).await;
            }
            Alert::Webhook(webhook) => {
                let message = format_message(change);
                self.send_webhook(webhook, &message, change).await;
            }
        }
    }

    async fn send_discord(&self, discord: &Discord, message: &Message) {
        match self.client.post(&discord.url).json(message).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("sent Discord alert");
                } else {
                    error!("Discord alert failed with status: {}", response.status());
                    if let Ok(error_text) = response.text().await {
                        error!("Discord API error response: {error_text}");
                    }
                }
            }
            Err(e) => {
                error!("failed to send Discord alert: {e}");
            }
        }
    }

    async fn send_webhook(&self, webhook: &Webhook, message: &str, change: &SeverityChange) {
        let payload = json!({
            "message": message,
            "severity": change.current.label(),
            "previous_severity": change.previous.as_ref().map(Severity::label),
            "percentage": change.percentage,
            "region": change.region_display(),
            "timestamp": change.timestamp.to_rfc3339(),
        });

        match self.client.post(&webhook.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("sent webhook alert");
                } else {
                    error!("webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("failed to send webhook alert: {e}");
            }
        }
    }
}

pub fn format_message(change: &SeverityChange) -> String {
    let region = change.region_display();
    if change.current.is_normal() {
        format!(
            "✅ **Recovered**: region `{region}` is back to normal ({:.2}% different)",
            change.percentage
        )
    } else {
        format!(
            "🚨 **{}**: region `{region}` is {:.2}% different from its template",
            capitalize(change.current.label()),
            change.percentage
        )
    }
}

pub fn build_discord_message(discord: &Discord, change: &SeverityChange) -> Message {
    let (title, color) = if change.current.is_normal() {
        ("✅ Region Recovered".to_string(), 3066993) // Green
    } else {
        (
            format!("🚨 {}", capitalize(change.current.label())),
            15158332, // Red
        )
    };

    let previous = change
        .previous
        .as_ref()
        .map(Severity::label)
        .unwrap_or("none");

    let embed = Embed {
        title: Some(title),
        description: Some(format_message(change)),
        color: Some(color),
        fields: vec![
            EmbedField {
                name: "📊 Difference".to_string(),
                value: format!("{:.2}%", change.percentage),
                inline: true,
            },
            EmbedField {
                name: "⏮️ Previous".to_string(),
                value: previous.to_string(),
                inline: true,
            },
        ],
        footer: Some(EmbedFooter {
            text: change.region_display(),
        }),
        timestamp: Some(change.timestamp.to_rfc3339()),
    };

    // only ping for detections, recoveries are informational
    let content = match &discord.user_id {
        Some(user_id) if !change.current.is_normal() => Some(format!(
            "🚨 ({} ~ {:.2}%) <@{user_id}>",
            change.current, change.percentage
        )),
        _ => None,
    };

    Message {
        content,
        embeds: vec![embed],
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
