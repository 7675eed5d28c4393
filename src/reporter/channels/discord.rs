use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use super::{Channel, ChannelError, ChannelResult};
use crate::config::Discord;

const REPORT_COLOR: u32 = 15105570; // Orange

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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
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

/// Discord webhook back-end
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    client: Client,
    config: Discord,
}

impl DiscordChannel {
    pub fn new(config: Discord) -> ChannelResult<Self> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(ChannelError::InvalidConfig(format!(
                "discord webhook url '{}' is not an http(s) url",
                config.url
            )));
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    pub fn build_report(&self, message: &str, hostname: &str) -> Message {
        let embed = Embed {
            title: Some(format!("📣 Report from {hostname}")),
            description: Some(message.to_string()),
            color: Some(REPORT_COLOR),
            footer: Some(EmbedFooter {
                text: format!("atella {}", crate::VERSION),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        };

        let mut builder = MessageBuilder::new();
        if let Some(user_id) = &self.config.user_id {
            builder = builder.content(format!("<@{user_id}>"));
        }
        builder.add_embed(embed).build()
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    #[instrument(skip(self, message))]
    async fn send(&self, message: &str, hostname: &str) -> ChannelResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }

        let body = self.build_report(message, hostname);
        let response = self.client.post(&self.config.url).json(&body).send().await?;

        if response.status().is_success() {
            info!("Successfully sent Discord message");
            Ok(true)
        } else {
            let status = response.status();
            error!("Discord message failed with status: {status}");
            if let Ok(error_text) = response.text().await {
                error!("Discord API error response: {error_text}");
            }
            Err(ChannelError::Rejected(format!("discord answered {status}")))
        }
    }
}
