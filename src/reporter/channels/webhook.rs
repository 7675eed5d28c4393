//! Generic JSON webhook
//!
//! Posts `{"hostname", "message", "timestamp"}` to the configured url. Any 2xx
//! answer counts as delivered.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{Channel, ChannelError, ChannelResult};
use crate::config::Webhook;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct Payload<'a> {
    hostname: &'a str,
    message: &'a str,
    timestamp: String,
}

#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    config: Webhook,
}

impl WebhookChannel {
    pub fn new(config: Webhook) -> ChannelResult<Self> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(ChannelError::InvalidConfig(format!(
                "webhook url '{}' must start with http:// or https://",
                config.url
            )));
        }

        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip(self, message), fields(url = %self.config.url))]
    async fn send(&self, message: &str, hostname: &str) -> ChannelResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }

        let payload = Payload {
            hostname,
            message,
            timestamp: Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("webhook accepted report");
            Ok(true)
        } else {
            warn!("webhook answered {status}");
            Err(ChannelError::Rejected(format!("webhook answered {status}")))
        }
    }
}
