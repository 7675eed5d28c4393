use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::topology::HostEntry;

/// Agent configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local hostname (falls back to the OS hostname when absent)
    pub hostname: Option<String>,

    /// Shared secret sent as `X-Atella-Auth` when pushing to the master
    #[serde(default)]
    pub security: String,

    /// Maximum number of peers probed per sector
    #[serde(default = "default_connectivity")]
    pub connectivity: i64,

    /// Log level for the `atella` target
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address the server binds on each local port
    #[serde(default = "default_listen")]
    pub listen: IpAddr,

    #[serde(default)]
    pub intervals: Intervals,

    #[serde(default)]
    pub hosts: Vec<HostEntry>,

    #[serde(default)]
    pub reporter: ReporterConfig,

    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

/// Loop and timeout settings, all in seconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intervals {
    #[serde(default = "default_probe_interval")]
    pub probe: u64,

    #[serde(default = "default_push_interval")]
    pub push: u64,

    /// Timeout for probe and push HTTP calls
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Intervals {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe)
    }

    pub fn push(&self) -> Duration {
        Duration::from_secs(self.push)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            probe: default_probe_interval(),
            push: default_push_interval(),
            timeout: default_timeout(),
        }
    }
}

/// Outbound notification queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Directory holding queued messages, one file each
    #[serde(default = "default_message_path")]
    pub message_path: PathBuf,

    /// Number of random bytes in a message file name
    #[serde(default = "default_hex_len")]
    pub hex_len: usize,

    /// Seconds between delivery passes
    #[serde(default = "default_reporter_interval")]
    pub interval: u64,

    /// Delivery attempts before a message is dropped
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            message_path: default_message_path(),
            hex_len: default_hex_len(),
            interval: default_reporter_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Notification channel back-ends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    /// TCP JSON chat-bot gateway
    TgBot(TgBot),
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TgBot {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Connect/read timeout in seconds
    #[serde(default = "default_channel_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_connectivity() -> i64 {
    1
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_listen() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_probe_interval() -> u64 {
    10
}

fn default_push_interval() -> u64 {
    10
}

fn default_timeout() -> u64 {
    5
}

fn default_message_path() -> PathBuf {
    PathBuf::from("/usr/share/atella/msg")
}

fn default_hex_len() -> usize {
    10
}

fn default_reporter_interval() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_enabled() -> bool {
    true
}

fn default_channel_timeout() -> u64 {
    2
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("can't read config file {path}: {e}"))?;
    parse_config(&file_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(r#"{ "hostname": "a" }"#).unwrap();

        assert_eq!(config.hostname.as_deref(), Some("a"));
        assert_eq!(config.connectivity, 1);
        assert_eq!(config.listen, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.intervals.probe, 10);
        assert_eq!(config.intervals.push, 10);
        assert_eq!(config.intervals.timeout, 5);
        assert_eq!(config.reporter.hex_len, 10);
        assert_eq!(config.reporter.max_attempts, 5);
        assert!(config.hosts.is_empty());
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_hosts_and_channels_parse() {
        let config = parse_config(
            r#"{
                "hostname": "a",
                "security": "s3cret",
                "connectivity": 3,
                "hosts": [
                    { "address": "10.0.0.1", "port": 5223, "hostname": "a", "master": true, "sectors": ["dc1"] },
                    { "address": "10.0.0.2", "port": 5223, "hostname": "b", "web_facing": true, "sectors": ["dc1", "dc2"] }
                ],
                "channels": [
                    { "type": "tgbot", "address": "bot.local", "port": 7000, "to": ["ops"] },
                    { "type": "webhook", "url": "http://hooks.local/x" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.security, "s3cret");
        assert_eq!(config.hosts.len(), 2);
        assert!(config.hosts[0].master);
        assert!(!config.hosts[0].web_facing);
        assert!(config.hosts[1].web_facing);
        assert_eq!(config.hosts[1].sectors, vec!["dc1", "dc2"]);

        assert_matches!(&config.channels[0], ChannelConfig::TgBot(bot) if bot.port == 7000 && bot.enabled);
        assert_matches!(&config.channels[1], ChannelConfig::Webhook(_));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(parse_config("not json").is_err());
        assert!(parse_config(r#"{ "channels": [ { "type": "pigeon" } ] }"#).is_err());
    }
}
