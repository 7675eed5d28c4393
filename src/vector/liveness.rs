use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{HealthRecord, Vector, vector_key};

/// Local view of peer health, keyed by `"address:port"`
#[derive(Debug, Clone, Default)]
pub struct LivenessVectorStore {
    records: Arc<RwLock<Vector>>,
}

impl LivenessVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for a peer.
    ///
    /// Returns `(record, true)` with a blank record when the peer has never
    /// been written, so callers can seed identity fields first.
    pub async fn get(&self, address: &str, port: u16) -> (HealthRecord, bool) {
        let records = self.records.read().await;
        match records.get(&vector_key(address, port)) {
            Some(record) => (record.clone(), false),
            None => (HealthRecord::blank(), true),
        }
    }

    /// Store `record` for a peer, stamped with the current time.
    pub async fn set(&self, address: &str, port: u16, record: HealthRecord) {
        let record = record.with_timestamp(Utc::now().timestamp());
        let mut records = self.records.write().await;
        records.insert(vector_key(address, port), record);
    }

    /// Owned copy of the whole vector
    pub async fn snapshot(&self) -> Vector {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
