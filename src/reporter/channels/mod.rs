//! Delivery back-ends for queued reports
//!
//! Every back-end implements [`Channel`]. The [`ChannelRegistry`] is built once
//! from the `channels` section of the configuration and looked up by the
//! lowercase channel type stored in each queued message.

pub mod discord;
pub mod tgbot;
pub mod webhook;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ChannelConfig;

pub use discord::DiscordChannel;
pub use tgbot::TgBotChannel;
pub use webhook::WebhookChannel;

pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug)]
pub enum ChannelError {
    /// Channel configuration can't be used for delivery
    InvalidConfig(String),

    Http(reqwest::Error),

    Io(std::io::Error),

    Serialization(serde_json::Error),

    /// Remote end answered but refused the message
    Rejected(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::InvalidConfig(msg) => write!(f, "invalid channel configuration: {msg}"),
            ChannelError::Http(e) => write!(f, "HTTP request failed: {e}"),
            ChannelError::Io(e) => write!(f, "I/O error: {e}"),
            ChannelError::Serialization(e) => write!(f, "serialization error: {e}"),
            ChannelError::Rejected(msg) => write!(f, "message rejected: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Http(e) => Some(e),
            ChannelError::Io(e) => Some(e),
            ChannelError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        ChannelError::Http(e)
    }
}

impl From<std::io::Error> for ChannelError {
    fn from(e: std::io::Error) -> Self {
        ChannelError::Io(e)
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        ChannelError::Serialization(e)
    }
}

#[async_trait]
pub trait Channel: Send + Sync {
    /// Lowercase channel type used as the registry key
    fn name(&self) -> &str;

    /// Deliver `message` on behalf of `hostname`.
    ///
    /// `Ok(false)` means the channel is switched off or the remote end did not
    /// confirm delivery. The message stays queued either way.
    async fn send(&self, message: &str, hostname: &str) -> ChannelResult<bool>;
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Box<dyn Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: &[ChannelConfig]) -> ChannelResult<Self> {
        let mut registry = Self::new();
        for config in configs {
            let channel: Box<dyn Channel> = match config {
                ChannelConfig::TgBot(bot) => Box::new(TgBotChannel::new(bot.clone())),
                ChannelConfig::Discord(discord) => Box::new(DiscordChannel::new(discord.clone())?),
                ChannelConfig::Webhook(hook) => Box::new(WebhookChannel::new(hook.clone())?),
            };
            registry.register(channel);
        }
        Ok(registry)
    }

    /// Add a channel, replacing any previous one of the same type
    pub fn register(&mut self, channel: Box<dyn Channel>) {
        let name = channel.name().to_lowercase();
        if self.channels.insert(name.clone(), channel).is_some() {
            warn!("channel '{name}' configured more than once, keeping the last one");
        } else {
            info!("registered report channel '{name}'");
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Channel> {
        self.channels
            .get(&name.to_lowercase())
            .map(|channel| channel.as_ref())
    }

    /// Registered channel types, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.names())
            .finish()
    }
}
