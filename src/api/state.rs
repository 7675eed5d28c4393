//! Shared state passed to all handlers

use std::sync::Arc;

use crate::vector::AggregateVectorStore;

#[derive(Debug, Clone)]
pub struct ApiState {
    /// Local hostname, served by the identity endpoints
    pub hostname: Arc<str>,

    pub version: Arc<str>,

    /// Expected `X-Atella-Auth` value on pushes
    pub secret: Arc<str>,

    /// Whether this host is the acting master
    pub is_master: bool,

    pub aggregate: AggregateVectorStore,
}

impl ApiState {
    pub fn new(
        hostname: &str,
        secret: &str,
        is_master: bool,
        aggregate: AggregateVectorStore,
    ) -> Self {
        Self {
            hostname: Arc::from(hostname),
            version: Arc::from(crate::VERSION),
            secret: Arc::from(secret),
            is_master,
            aggregate,
        }
    }
}
