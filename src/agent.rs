//! Process wiring
//!
//! [`Agent::start`] turns a loaded [`Config`] into running tasks: the HTTP
//! server on every local port, one probe actor per local sector, the master
//! client and, optionally, the reporter. Every task watches the same stop
//! token.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::actors::master::{Election, MasterClientHandle, elect};
use crate::actors::probe::SectorProbeHandle;
use crate::api::{self, ApiState, ServerHandle, ingest::spawn_local_ingest};
use crate::config::Config;
use crate::reporter::Reporter;
use crate::reporter::channels::ChannelRegistry;
use crate::topology::Topology;
use crate::vector::{AggregateVectorStore, LivenessVectorStore};

/// Startup switches that are not part of the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentOptions {
    pub without_reporter: bool,
}

pub struct Agent {
    topology: Arc<Topology>,
    liveness: LivenessVectorStore,
    aggregate: AggregateVectorStore,
    election: Election,
    server: ServerHandle,
    ingest: Option<JoinHandle<()>>,
    probes: Vec<SectorProbeHandle>,
    master: MasterClientHandle,
    reporter: Option<(Reporter, JoinHandle<()>)>,
    stop: CancellationToken,
}

impl Agent {
    /// Build every component for `hostname` and start it.
    ///
    /// Fails on an invalid topology, an unusable reporter setup or a port that
    /// can't be bound.
    pub async fn start(
        config: Config,
        hostname: &str,
        options: AgentOptions,
        stop: CancellationToken,
    ) -> anyhow::Result<Self> {
        let Config {
            security,
            connectivity,
            listen,
            intervals,
            hosts,
            reporter: reporter_config,
            channels,
            ..
        } = config;

        let topology = Topology::build(hosts, hostname, connectivity)
            .context("invalid host configuration")?;
        topology.log_summary();
        let topology = Arc::new(topology);

        let liveness = LivenessVectorStore::new();
        let aggregate = AggregateVectorStore::new();

        let election = elect(&topology);
        let is_master = election.is_local();

        let mut bind_addrs: Vec<SocketAddr> = Vec::new();
        for &index in topology.self_indexes() {
            if let Some(host) = topology.host(index) {
                let addr = SocketAddr::new(listen, host.port);
                if !bind_addrs.contains(&addr) {
                    bind_addrs.push(addr);
                }
            }
        }
        if bind_addrs.is_empty() {
            warn!("hostname '{hostname}' not found in hosts list, not serving any port");
        }

        let state = ApiState::new(hostname, &security, is_master, aggregate.clone());
        let server = api::spawn_server(&bind_addrs, state, stop.clone()).await?;

        let (local_tx, ingest) = if is_master {
            let (tx, rx) = mpsc::channel(32);
            let task = spawn_local_ingest(rx, aggregate.clone(), stop.clone());
            (Some(tx), Some(task))
        } else {
            (None, None)
        };

        let mut probes = Vec::new();
        for (name, _) in topology.local_sectors() {
            let probe =
                SectorProbeHandle::spawn(name, &topology, liveness.clone(), intervals, stop.clone())?;
            probes.push(probe);
        }

        let master = MasterClientHandle::spawn(
            topology.clone(),
            liveness.clone(),
            security,
            local_tx,
            intervals,
            stop.clone(),
        )?;

        let reporter = if options.without_reporter {
            info!("reporter disabled");
            None
        } else {
            let registry =
                ChannelRegistry::from_config(&channels).context("invalid channel configuration")?;
            let reporter = Reporter::new(&reporter_config, hostname, registry)?;
            let task = reporter.spawn(stop.clone());
            Some((reporter, task))
        };

        Ok(Self {
            topology,
            liveness,
            aggregate,
            election,
            server,
            ingest,
            probes,
            master,
            reporter,
            stop,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn liveness(&self) -> &LivenessVectorStore {
        &self.liveness
    }

    /// Aggregate vector, only populated on the master
    pub fn aggregate(&self) -> &AggregateVectorStore {
        &self.aggregate
    }

    pub fn election(&self) -> Election {
        self.election
    }

    pub fn reporter(&self) -> Option<&Reporter> {
        self.reporter.as_ref().map(|(reporter, _)| reporter)
    }

    pub fn listen_addrs(&self) -> &[SocketAddr] {
        self.server.addrs()
    }

    pub fn probes(&self) -> &[SectorProbeHandle] {
        &self.probes
    }

    pub fn master(&self) -> &MasterClientHandle {
        &self.master
    }

    /// Cancel the stop token and wait for every task
    pub async fn shutdown(self) {
        self.stop.cancel();
        self.wait().await;
    }

    /// Wait until every task has exited
    pub async fn wait(self) {
        for probe in self.probes {
            let sector = probe.sector().to_string();
            if let Err(e) = probe.join().await {
                error!("probe for sector '{sector}': {e:#}");
            }
        }

        if let Err(e) = self.master.join().await {
            error!("{e:#}");
        }

        if let Some((_, task)) = self.reporter {
            if let Err(e) = task.await {
                error!("reporter task failed: {e}");
            }
        }

        if let Some(task) = self.ingest {
            if let Err(e) = task.await {
                error!("ingest task failed: {e}");
            }
        }

        self.server.join().await;
        info!("agent stopped");
    }
}
