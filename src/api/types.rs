//! Response payloads

use serde::{Deserialize, Serialize};

/// Payload of `GET /api/v1/get/host`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub version: String,
}

/// Form body of `POST /api/v1/set/vector`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VectorForm {
    #[serde(default)]
    pub hostname: String,

    /// JSON-encoded [`Vector`](crate::Vector)
    #[serde(default)]
    pub vector: String,
}
