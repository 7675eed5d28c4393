//! Outbound reports
//!
//! [`Reporter::report`] persists each message as a small JSON file inside the
//! message directory, so queued reports survive restarts. A background pass
//! walks the directory on every tick and hands each message to the channel
//! named in its `target` field.

pub mod channels;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ReporterConfig;
use channels::ChannelRegistry;

/// Target that fans a report out to every registered channel
pub const ALL_CHANNELS: &str = "all";

/// Random names tried before giving up on queueing a report
const MAX_NAME_ATTEMPTS: usize = 64;

/// On-disk form of a queued report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub target: String,
    pub message: String,
    /// Failed deliveries so far
    #[serde(default)]
    pub attempts: u32,
}

/// Outcome of one delivery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub delivered: usize,
    pub retried: usize,
    pub dropped: usize,
}

#[derive(Debug)]
struct Inner {
    message_path: PathBuf,
    hex_len: usize,
    max_attempts: u32,
    interval: Duration,
    hostname: String,
    channels: ChannelRegistry,
    /// Held for the duration of a delivery pass
    pass: Mutex<()>,
}

#[derive(Debug, Clone)]
pub struct Reporter {
    inner: Arc<Inner>,
}

impl Reporter {
    pub fn new(
        config: &ReporterConfig,
        hostname: &str,
        channels: ChannelRegistry,
    ) -> anyhow::Result<Self> {
        if config.hex_len == 0 {
            bail!("reporter hex_len must be greater than 0");
        }
        if config.interval == 0 {
            bail!("reporter interval must be greater than 0");
        }

        std::fs::create_dir_all(&config.message_path).with_context(|| {
            format!(
                "can't create message directory {}",
                config.message_path.display()
            )
        })?;

        Ok(Self {
            inner: Arc::new(Inner {
                message_path: config.message_path.clone(),
                hex_len: config.hex_len,
                max_attempts: config.max_attempts.max(1),
                interval: Duration::from_secs(config.interval),
                hostname: hostname.to_string(),
                channels,
                pass: Mutex::new(()),
            }),
        })
    }

    pub fn message_path(&self) -> &Path {
        &self.inner.message_path
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.inner.channels
    }

    /// Queue `message` for `target` and return the created file names.
    ///
    /// `"all"` (any case) queues one copy per registered channel.
    #[instrument(skip(self, message))]
    pub async fn report(&self, message: &str, target: &str) -> anyhow::Result<Vec<String>> {
        let targets = if target.eq_ignore_ascii_case(ALL_CHANNELS) {
            let names = self.inner.channels.names();
            if names.is_empty() {
                warn!("no channels registered, report to 'all' is discarded");
            }
            names
        } else {
            vec![target.to_lowercase()]
        };

        let mut tickets = Vec::with_capacity(targets.len());
        for target in targets {
            let queued = QueuedMessage {
                target,
                message: message.to_string(),
                attempts: 0,
            };
            let ticket = self.enqueue(&queued).await?;
            info!("queued report {ticket} for '{}'", queued.target);
            tickets.push(ticket);
        }

        Ok(tickets)
    }

    /// Write `queued` under a fresh random name.
    ///
    /// The content goes to a hidden temp file first and is linked under its
    /// final name only once complete, so a delivery pass never sees a partial
    /// report. Linking fails instead of overwriting an existing report.
    async fn enqueue(&self, queued: &QueuedMessage) -> anyhow::Result<String> {
        let content = serde_json::to_vec(queued).context("can't encode report")?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = random_hex(self.inner.hex_len)?;
            let path = self.inner.message_path.join(&name);
            let staging = self.inner.message_path.join(format!(".{name}.tmp"));

            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&staging)
                .await;

            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("report name {name} taken, picking another");
                    continue;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("can't create report {}", staging.display()));
                }
            };

            let written = async {
                file.write_all(&content).await?;
                file.sync_all().await
            }
            .await;
            drop(file);

            let published = match written {
                Ok(()) => tokio::fs::hard_link(&staging, &path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = tokio::fs::remove_file(&staging).await {
                warn!("can't remove staging file {}: {e}", staging.display());
            }

            match published {
                Ok(()) => return Ok(name),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("report name {name} taken, picking another");
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("can't write report {}", path.display()));
                }
            }
        }

        bail!(
            "no free report name after {MAX_NAME_ATTEMPTS} attempts, hex_len {} is too small for the queue",
            self.inner.hex_len
        )
    }

    /// Run one delivery pass over the queue.
    ///
    /// Returns `None` without touching the queue when another pass is running.
    #[instrument(skip(self))]
    pub async fn send_pending(&self) -> anyhow::Result<Option<PassStats>> {
        let Ok(_guard) = self.inner.pass.try_lock() else {
            info!("delivery pass already in progress");
            return Ok(None);
        };

        let mut stats = PassStats::default();
        let mut entries = tokio::fs::read_dir(&self.inner.message_path)
            .await
            .with_context(|| {
                format!(
                    "can't read message directory {}",
                    self.inner.message_path.display()
                )
            })?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            self.deliver(&entry.path(), &name, &mut stats).await;
        }

        if stats != PassStats::default() {
            info!(
                "delivery pass: {} delivered, {} retried, {} dropped",
                stats.delivered, stats.retried, stats.dropped
            );
        }
        Ok(Some(stats))
    }

    async fn deliver(&self, path: &Path, name: &str, stats: &mut PassStats) {
        let queued = match read_message(path).await {
            Ok(queued) => queued,
            Err(e) => {
                error!("dropping unreadable report {name}: {e:#}");
                self.discard(path, stats).await;
                return;
            }
        };

        let Some(channel) = self.inner.channels.get(&queued.target) else {
            error!("dropping report {name}: unsupported channel '{}'", queued.target);
            self.discard(path, stats).await;
            return;
        };

        let delivered = match channel.send(&queued.message, &self.inner.hostname).await {
            Ok(delivered) => delivered,
            Err(e) => {
                error!("report {name} via '{}' failed: {e}", queued.target);
                false
            }
        };

        if delivered {
            debug!("report {name} delivered via '{}'", queued.target);
            if let Err(e) = tokio::fs::remove_file(path).await {
                error!("can't remove delivered report {name}: {e}");
            }
            stats.delivered += 1;
            return;
        }

        let queued = QueuedMessage {
            attempts: queued.attempts + 1,
            ..queued
        };
        if queued.attempts >= self.inner.max_attempts {
            error!(
                "dropping report {name} after {} failed attempts",
                queued.attempts
            );
            self.discard(path, stats).await;
            return;
        }

        match serde_json::to_vec(&queued) {
            Ok(content) => {
                if let Err(e) = tokio::fs::write(path, content).await {
                    error!("can't update report {name}: {e}");
                }
            }
            Err(e) => error!("can't encode report {name}: {e}"),
        }
        stats.retried += 1;
    }

    async fn discard(&self, path: &Path, stats: &mut PassStats) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            error!("can't remove report {}: {e}", path.display());
        }
        stats.dropped += 1;
    }

    /// Start the background delivery loop
    pub fn spawn(&self, stop: CancellationToken) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move { reporter.run(stop).await })
    }

    #[instrument(skip_all)]
    async fn run(self, stop: CancellationToken) {
        let period = self.inner.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "reporter started, queue at {}",
            self.inner.message_path.display()
        );

        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    info!("reporter stopped");
                    return;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.send_pending().await {
                        error!("delivery pass failed: {e:#}");
                    }
                }
            }
        }
    }
}

async fn read_message(path: &Path) -> anyhow::Result<QueuedMessage> {
    let content = tokio::fs::read_to_string(path).await?;
    let queued = serde_json::from_str(&content)?;
    Ok(queued)
}

/// Hex encoding of `len` random bytes
pub fn random_hex(len: usize) -> anyhow::Result<String> {
    if len == 0 {
        bail!("length must be greater than 0");
    }

    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
