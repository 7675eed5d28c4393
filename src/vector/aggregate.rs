use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::{AggregateVector, Vector};

/// Cluster view held by the master, keyed by reporting hostname
#[derive(Debug, Clone, Default)]
pub struct AggregateVectorStore {
    vectors: Arc<RwLock<AggregateVector>>,
}

impl AggregateVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything `hostname` reported before with `vector`.
    pub async fn set_for_host(&self, hostname: &str, vector: Vector) {
        debug!("storing {} records reported by {hostname}", vector.len());
        let mut vectors = self.vectors.write().await;
        vectors.insert(hostname.to_string(), vector);
    }

    pub async fn get_for_host(&self, hostname: &str) -> Option<Vector> {
        self.vectors.read().await.get(hostname).cloned()
    }

    /// Owned copy of the whole aggregate
    pub async fn snapshot(&self) -> AggregateVector {
        self.vectors.read().await.clone()
    }
}
