//! MasterClientActor - Forwards the local vector to the master
//!
//! Election runs once when the actor is created. Afterwards, on every tick,
//! the actor snapshots the [`LivenessVectorStore`] and either hands it to the
//! co-located aggregation server (local host is master) or POSTs it to the
//! elected remote master. A failed push is logged and superseded by the next
//! tick's snapshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::Intervals;
use crate::topology::{Masters, Topology};
use crate::vector::LivenessVectorStore;

use super::messages::{LocalPush, MasterCommand};

/// Header carrying the shared secret on pushes
pub const AUTH_HEADER: &str = "X-Atella-Auth";

/// Outcome of master election
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Election {
    /// The local host is the acting master
    Local,
    /// Push to the host at this topology index
    Remote(usize),
    /// No master is configured
    Unavailable,
}

impl Election {
    pub fn is_local(&self) -> bool {
        matches!(self, Election::Local)
    }
}

/// Pick the acting master.
///
/// A host flagged as master acts as one without further election. Everyone
/// else pushes to the first master in topology order; further masters are
/// ignored.
pub fn elect(topology: &Topology) -> Election {
    let Masters::Configured(indexes) = topology.masters() else {
        return Election::Unavailable;
    };

    if indexes.iter().any(|&index| topology.is_self(index)) {
        return Election::Local;
    }

    let Some(&master) = indexes.first() else {
        return Election::Unavailable;
    };

    if indexes.len() > 1 {
        warn!("only one master server supported, using index {master}");
    }

    Election::Remote(master)
}

pub struct MasterClientActor {
    topology: Arc<Topology>,

    election: Election,

    store: LivenessVectorStore,

    /// HTTP client (reused across pushes)
    client: reqwest::Client,

    secret: String,

    /// In-process path to the local aggregation server
    local_tx: Option<mpsc::Sender<LocalPush>>,

    command_rx: mpsc::Receiver<MasterCommand>,

    stop: CancellationToken,

    interval_duration: Duration,
}

impl MasterClientActor {
    pub fn new(
        topology: Arc<Topology>,
        store: LivenessVectorStore,
        secret: String,
        local_tx: Option<mpsc::Sender<LocalPush>>,
        intervals: Intervals,
        command_rx: mpsc::Receiver<MasterCommand>,
        stop: CancellationToken,
    ) -> Result<Self> {
        let election = elect(&topology);

        let client = reqwest::Client::builder()
            .timeout(intervals.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            topology,
            election,
            store,
            client,
            secret,
            local_tx,
            command_rx,
            stop,
            interval_duration: intervals.push(),
        })
    }

    /// Run the push loop until the stop signal is cancelled.
    ///
    /// Exits right away when no master is configured.
    #[instrument(skip(self), fields(host = %self.topology.hostname()))]
    pub async fn run(mut self) {
        match self.election {
            Election::Local => info!("this host is the master"),
            Election::Remote(index) => {
                if let Some(master) = self.topology.host(index) {
                    info!(
                        "elected master {} ({}:{})",
                        master.hostname, master.address, master.port
                    );
                }
            }
            Election::Unavailable => {
                error!("master servers not configured");
                return;
            }
        }

        // the first push waits one full interval so probes can land first
        let mut ticker = interval_at(
            Instant::now() + self.interval_duration,
            self.interval_duration,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.stop.cancelled() => {
                    debug!("stop requested");
                    break;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.push().await {
                        warn!("failed to push vector: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        MasterCommand::PushNow { respond_to } => {
                            debug!("received PushNow command");
                            let result = self.push().await;
                            let _ = respond_to.send(result);
                        }
                    }
                }
            }
        }

        debug!("master client stopped");
    }

    async fn push(&self) -> Result<()> {
        let vector = self.store.snapshot().await;

        match self.election {
            Election::Local => {
                let tx = self
                    .local_tx
                    .as_ref()
                    .context("no local aggregation path")?;
                tx.send(LocalPush {
                    hostname: self.topology.hostname().to_string(),
                    vector,
                })
                .await
                .context("local aggregation path closed")?;
                trace!("handed vector to local aggregation server");
                Ok(())
            }
            Election::Remote(index) => {
                let master = self
                    .topology
                    .host(index)
                    .with_context(|| format!("master index {index} out of range"))?;
                let url = format!("http://{}:{}/api/v1/set/vector", master.address, master.port);

                let encoded = serde_json::to_string(&vector).context("failed to encode vector")?;
                let response = self
                    .client
                    .post(&url)
                    .header(AUTH_HEADER, &self.secret)
                    .form(&[("hostname", self.topology.hostname()), ("vector", encoded.as_str())])
                    .send()
                    .await
                    .with_context(|| format!("failed to send vector to {url}"))?;

                if !response.status().is_success() {
                    anyhow::bail!("{url}: HTTP error: {}", response.status());
                }

                trace!("pushed {} records to {url}", vector.len());
                Ok(())
            }
            Election::Unavailable => anyhow::bail!("no master configured"),
        }
    }
}

/// Handle for controlling the MasterClientActor
pub struct MasterClientHandle {
    sender: mpsc::Sender<MasterCommand>,

    election: Election,

    task: JoinHandle<()>,
}

impl MasterClientHandle {
    pub fn spawn(
        topology: Arc<Topology>,
        store: LivenessVectorStore,
        secret: String,
        local_tx: Option<mpsc::Sender<LocalPush>>,
        intervals: Intervals,
        stop: CancellationToken,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor =
            MasterClientActor::new(topology, store, secret, local_tx, intervals, cmd_rx, stop)?;
        let election = actor.election;

        let task = tokio::spawn(actor.run());

        Ok(Self {
            sender: cmd_tx,
            election,
            task,
        })
    }

    /// Push the current snapshot now
    pub async fn push_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MasterCommand::PushNow { respond_to: tx })
            .await
            .context("failed to send PushNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    pub fn election(&self) -> Election {
        self.election
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<()> {
        self.task.await.context("master client panicked")
    }
}
