//! SectorProbeActor - Checks the liveness of sector peers
//!
//! One actor runs per sector the local host belongs to. Its candidate list is
//! fixed at construction: the sector members that are not the local host, in
//! topology order, truncated to the connectivity budget.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → GET /api/v1/get/hostname on each candidate → compare hostname → LivenessVectorStore::set
//!     ↑
//!     └─── Commands (ProbeNow) / stop signal
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::Intervals;
use crate::topology::{HostEntry, Topology};
use crate::vector::LivenessVectorStore;
use crate::{Envelope, HealthRecord};

use super::messages::ProbeCommand;

/// Peer checked by a probe actor
#[derive(Debug, Clone)]
struct ProbeTarget {
    index: usize,
    address: String,
    port: u16,
    hostname: String,
}

impl ProbeTarget {
    fn new(index: usize, host: &HostEntry) -> Self {
        Self {
            index,
            address: host.address.clone(),
            port: host.port,
            hostname: host.hostname.clone(),
        }
    }

    fn url(&self) -> String {
        format!("http://{}:{}/api/v1/get/hostname", self.address, self.port)
    }
}

/// Actor that probes the candidates of a single sector
pub struct SectorProbeActor {
    sector: String,

    targets: Vec<ProbeTarget>,

    store: LivenessVectorStore,

    /// HTTP client (reused across probes)
    client: reqwest::Client,

    command_rx: mpsc::Receiver<ProbeCommand>,

    stop: CancellationToken,

    interval_duration: Duration,
}

impl SectorProbeActor {
    pub fn new(
        sector: &str,
        topology: &Topology,
        store: LivenessVectorStore,
        intervals: Intervals,
        command_rx: mpsc::Receiver<ProbeCommand>,
        stop: CancellationToken,
    ) -> Result<Self> {
        let targets = topology
            .sector(sector)
            .map(|members| members.candidates(topology.connectivity()))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|index| topology.host(index).map(|host| ProbeTarget::new(index, host)))
            .collect();

        let client = reqwest::Client::builder()
            .timeout(intervals.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            sector: sector.to_string(),
            targets,
            store,
            client,
            command_rx,
            stop,
            interval_duration: intervals.probe(),
        })
    }

    fn target_indexes(&self) -> Vec<usize> {
        self.targets.iter().map(|target| target.index).collect()
    }

    /// Run the actor's main loop
    ///
    /// Returns immediately when there is nothing to check. Otherwise sweeps
    /// right away and then pauses a full probe interval after every sweep,
    /// until the stop signal is cancelled.
    #[instrument(skip(self), fields(sector = %self.sector))]
    pub async fn run(mut self) {
        info!("checking indexes {:?}", self.target_indexes());

        if self.targets.is_empty() {
            warn!("nothing to check");
            return;
        }

        let mut next_sweep = Instant::now();

        loop {
            tokio::select! {
                biased;

                _ = self.stop.cancelled() => {
                    debug!("stop requested");
                    break;
                }

                _ = sleep_until(next_sweep) => {
                    self.sweep().await;
                    next_sweep = Instant::now() + self.interval_duration;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        ProbeCommand::ProbeNow { respond_to } => {
                            debug!("received ProbeNow command");
                            let probed = self.sweep().await;
                            next_sweep = Instant::now() + self.interval_duration;
                            let _ = respond_to.send(probed);
                        }
                    }
                }
            }
        }

        debug!("probe actor stopped");
    }

    /// Probe every candidate once, in order
    async fn sweep(&self) -> usize {
        for target in &self.targets {
            self.probe(target).await;
        }
        self.targets.len()
    }

    #[instrument(skip_all, fields(target = %target.hostname, port = target.port))]
    async fn probe(&self, target: &ProbeTarget) {
        let (previous, is_new) = self.store.get(&target.address, target.port).await;
        let record = if is_new {
            HealthRecord::new(target.address.clone(), target.port, target.hostname.clone())
        } else {
            previous
        };

        let reachable = match self.fetch_hostname(target).await {
            Ok(hostname) if hostname == target.hostname => {
                trace!("{}: alive", target.url());
                true
            }
            Ok(hostname) => {
                warn!(
                    "{}: answered as '{hostname}', expected '{}'",
                    target.url(),
                    target.hostname
                );
                false
            }
            Err(e) => {
                warn!("{}: {:#}", target.url(), e);
                false
            }
        };

        self.store
            .set(&target.address, target.port, record.with_reachable(reachable))
            .await;
    }

    async fn fetch_hostname(&self, target: &ProbeTarget) -> Result<String> {
        let response = self
            .client
            .get(target.url())
            .send()
            .await
            .context("failed to send HTTP request")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let body: Envelope<String> = response
            .json()
            .await
            .context("failed to parse hostname response")?;

        Ok(body.response)
    }
}

/// Handle for controlling a SectorProbeActor
pub struct SectorProbeHandle {
    sender: mpsc::Sender<ProbeCommand>,

    sector: String,

    /// Host indexes this actor probes, in order
    targets: Vec<usize>,

    task: JoinHandle<()>,
}

impl SectorProbeHandle {
    /// Spawn a probe actor for `sector`
    pub fn spawn(
        sector: &str,
        topology: &Topology,
        store: LivenessVectorStore,
        intervals: Intervals,
        stop: CancellationToken,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = SectorProbeActor::new(sector, topology, store, intervals, cmd_rx, stop)?;
        let targets = actor.target_indexes();

        let task = tokio::spawn(actor.run());

        Ok(Self {
            sender: cmd_tx,
            sector: sector.to_string(),
            targets,
            task,
        })
    }

    /// Run one sweep now, returning the number of hosts probed
    pub async fn probe_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ProbeCommand::ProbeNow { respond_to: tx })
            .await
            .context("failed to send ProbeNow command")?;

        rx.await.context("failed to receive response")
    }

    pub fn sector(&self) -> &str {
        &self.sector
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the actor to exit
    pub async fn join(self) -> Result<()> {
        self.task.await.context("probe actor panicked")
    }
}
