//! Chat-bot gateway reached over plain TCP
//!
//! One connection per message: the packet is written as a single JSON line and
//! the gateway answers with one line, `ok` on success.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument};

use super::{Channel, ChannelError, ChannelResult};
use crate::config::TgBot;

#[derive(Debug, Serialize)]
struct Packet<'a> {
    command: &'a str,
    message: BotMessage<'a>,
}

#[derive(Debug, Serialize)]
struct BotMessage<'a> {
    event: &'a str,
    usernames: &'a [String],
    text: String,
}

fn timed_out(msg: String) -> ChannelError {
    ChannelError::Io(io::Error::new(io::ErrorKind::TimedOut, msg))
}

#[derive(Debug, Clone)]
pub struct TgBotChannel {
    config: TgBot,
}

impl TgBotChannel {
    pub fn new(config: TgBot) -> Self {
        Self { config }
    }

    fn net_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout)
    }

    async fn exchange(&self, payload: &[u8]) -> ChannelResult<String> {
        let addr = format!("{}:{}", self.config.address, self.config.port);
        let mut stream = timeout(self.net_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| timed_out(format!("connect to {addr} timed out")))??;

        stream.write_all(payload).await?;
        stream.flush().await?;

        let mut reply = String::new();
        let mut reader = BufReader::new(stream);
        timeout(self.net_timeout(), reader.read_line(&mut reply))
            .await
            .map_err(|_| timed_out(format!("no reply from {addr}")))??;

        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl Channel for TgBotChannel {
    fn name(&self) -> &str {
        "tgbot"
    }

    #[instrument(skip(self, message), fields(gateway = %self.config.address))]
    async fn send(&self, message: &str, hostname: &str) -> ChannelResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        if self.config.to.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "tgbot recipient list is empty".to_string(),
            ));
        }

        let packet = Packet {
            command: "sendMessage",
            message: BotMessage {
                event: "personal",
                usernames: &self.config.to,
                text: format!("[{hostname}]: {message}"),
            },
        };
        let mut payload = serde_json::to_vec(&packet)?;
        payload.push(b'\n');

        let reply = self.exchange(&payload).await?;
        debug!("gateway replied '{reply}'");
        Ok(reply == "ok")
    }
}
