pub mod actors;
pub mod agent;
pub mod api;
pub mod config;
pub mod reporter;
pub mod topology;
pub mod util;
pub mod vector;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Agent version reported by the identity endpoints.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Liveness vector of one host, keyed by `"address:port"`.
pub type Vector = BTreeMap<String, HealthRecord>;

/// Cluster-wide view held by the master, keyed by reporting hostname.
pub type AggregateVector = BTreeMap<String, Vector>;

/// Observed health of a single peer.
///
/// Records are never patched in place. Every observation produces a new value
/// which then replaces the previous one in its store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub address: String,
    pub port: u16,
    pub hostname: String,
    pub reachable: bool,
    /// Unix seconds of the last update, `-1` if never written.
    pub timestamp: i64,
}

impl HealthRecord {
    /// Placeholder returned for peers that have no record yet.
    pub fn blank() -> Self {
        Self {
            address: String::new(),
            port: 0,
            hostname: String::new(),
            reachable: false,
            timestamp: -1,
        }
    }

    pub fn new(address: impl Into<String>, port: u16, hostname: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            hostname: hostname.into(),
            ..Self::blank()
        }
    }

    pub fn with_reachable(self, reachable: bool) -> Self {
        Self { reachable, ..self }
    }

    pub fn with_timestamp(self, timestamp: i64) -> Self {
        Self { timestamp, ..self }
    }
}

/// Body envelope shared by every JSON endpoint: `{"response": <payload>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

impl<T> Envelope<T> {
    pub fn new(response: T) -> Self {
        Self { response }
    }
}

/// Key under which a peer is stored in a [`Vector`].
pub fn vector_key(address: &str, port: u16) -> String {
    format!("{address}:{port}")
}
