//! Static fleet topology
//!
//! The host list from the configuration file is parsed once at startup into a
//! [`Topology`]: which entries are the local host, which are masters, and which
//! hosts share each sector. The result is never mutated afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Sentinel used when printing the master set of a fleet without masters.
pub const NO_MASTER: i64 = -1;

/// One configured host instance, identified by `(address, port)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub address: String,
    pub port: u16,
    pub hostname: String,
    #[serde(default)]
    pub web_facing: bool,
    #[serde(default)]
    pub master: bool,
    #[serde(default)]
    pub sectors: Vec<String>,
}

/// Members of one sector, as host indexes in topology order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sector {
    pub members: Vec<usize>,
    /// Subset of `members` that are the local host
    pub self_members: Vec<usize>,
}

impl Sector {
    /// Peers the local host checks in this sector.
    ///
    /// Non-self members in topology order, truncated to `connectivity`.
    pub fn candidates(&self, connectivity: i64) -> Vec<usize> {
        if connectivity <= 0 {
            return Vec::new();
        }

        self.members
            .iter()
            .copied()
            .filter(|index| !self.self_members.contains(index))
            .take(connectivity as usize)
            .collect()
    }
}

/// Configured master hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Masters {
    /// No entry is flagged as master
    Unconfigured,
    /// Indexes of every entry flagged as master, in topology order
    Configured(Vec<usize>),
}

impl Masters {
    /// Master indexes with [`NO_MASTER`] standing in for an empty set.
    pub fn as_indexes(&self) -> Vec<i64> {
        match self {
            Masters::Unconfigured => vec![NO_MASTER],
            Masters::Configured(indexes) => indexes.iter().map(|&i| i as i64).collect(),
        }
    }

    pub fn first(&self) -> Option<usize> {
        match self {
            Masters::Unconfigured => None,
            Masters::Configured(indexes) => indexes.first().copied(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Topology {
    hosts: Vec<HostEntry>,
    hostname: String,
    self_indexes: Vec<usize>,
    masters: Masters,
    sectors: BTreeMap<String, Sector>,
    connectivity: i64,
}

impl Topology {
    /// Build the topology for `hostname` from the configured host list.
    ///
    /// Fails if two entries share an `(address, port)` pair. A positive
    /// `connectivity` is raised to the largest number of entries sharing one
    /// hostname so that every replica of a logical host gets probed.
    pub fn build(
        hosts: Vec<HostEntry>,
        hostname: &str,
        connectivity: i64,
    ) -> Result<Self, TopologyError> {
        let mut identities: HashMap<(&str, u16), usize> = HashMap::new();
        let mut hostname_counts: HashMap<&str, i64> = HashMap::new();

        for (index, host) in hosts.iter().enumerate() {
            if let Some(&first) = identities.get(&(host.address.as_str(), host.port)) {
                return Err(TopologyError::DuplicateHost {
                    address: host.address.clone(),
                    port: host.port,
                    first,
                    second: index,
                });
            }
            identities.insert((host.address.as_str(), host.port), index);
            *hostname_counts.entry(host.hostname.as_str()).or_default() += 1;
        }

        let mut effective_connectivity = connectivity;
        if connectivity > 0 {
            let max_duplicates = hostname_counts.values().copied().max().unwrap_or(0);
            if max_duplicates > connectivity {
                warn!(
                    "raising connectivity from {connectivity} to {max_duplicates} to cover duplicate hostnames"
                );
                effective_connectivity = max_duplicates;
            }
        }

        let self_indexes: Vec<usize> = hosts
            .iter()
            .enumerate()
            .filter(|(_, host)| host.hostname == hostname)
            .map(|(index, _)| index)
            .collect();

        let master_indexes: Vec<usize> = hosts
            .iter()
            .enumerate()
            .filter(|(_, host)| host.master)
            .map(|(index, _)| index)
            .collect();
        let masters = if master_indexes.is_empty() {
            Masters::Unconfigured
        } else {
            Masters::Configured(master_indexes)
        };

        let mut sectors: BTreeMap<String, Sector> = BTreeMap::new();
        for (index, host) in hosts.iter().enumerate() {
            let is_self = self_indexes.contains(&index);
            // a sector repeated on one entry counts once
            for name in &host.sectors {
                let sector = sectors.entry(name.clone()).or_default();
                if sector.members.contains(&index) {
                    continue;
                }
                sector.members.push(index);
                if is_self {
                    sector.self_members.push(index);
                }
            }
        }

        Ok(Self {
            hosts,
            hostname: hostname.to_string(),
            self_indexes,
            masters,
            sectors,
            connectivity: effective_connectivity,
        })
    }

    pub fn hosts(&self) -> &[HostEntry] {
        &self.hosts
    }

    pub fn host(&self, index: usize) -> Option<&HostEntry> {
        self.hosts.get(index)
    }

    /// Local hostname the topology was built for
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn self_indexes(&self) -> &[usize] {
        &self.self_indexes
    }

    pub fn is_self(&self, index: usize) -> bool {
        self.self_indexes.contains(&index)
    }

    pub fn masters(&self) -> &Masters {
        &self.masters
    }

    pub fn sectors(&self) -> &BTreeMap<String, Sector> {
        &self.sectors
    }

    pub fn sector(&self, name: &str) -> Option<&Sector> {
        self.sectors.get(name)
    }

    /// Sectors the local host is a member of
    pub fn local_sectors(&self) -> impl Iterator<Item = (&String, &Sector)> {
        self.sectors
            .iter()
            .filter(|(_, sector)| !sector.self_members.is_empty())
    }

    /// Connectivity after the duplicate-hostname adjustment
    pub fn connectivity(&self) -> i64 {
        self.connectivity
    }

    pub fn log_summary(&self) {
        info!("self indexes {:?}", self.self_indexes);
        info!("master servers {:?}", self.masters.as_indexes());
        for (name, sector) in &self.sectors {
            info!(
                "sector '{name}': members {:?}, self {:?}",
                sector.members, sector.self_members
            );
        }
    }
}

/// Errors detected while building the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Two entries share the same `(address, port)` identity
    DuplicateHost {
        address: String,
        port: u16,
        first: usize,
        second: usize,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::DuplicateHost {
                address,
                port,
                first,
                second,
            } => write!(
                f,
                "duplicate host {address}:{port} (entries {first} and {second})"
            ),
        }
    }
}

impl std::error::Error for TopologyError {}
