//! Identity endpoints, used by peers to verify liveness

use axum::{Json, extract::State};

use crate::Envelope;
use crate::api::{state::ApiState, types::HostInfo};

/// GET /api/v1/get/hostname
pub async fn get_hostname(State(state): State<ApiState>) -> Json<Envelope<String>> {
    Json(Envelope::new(state.hostname.to_string()))
}

/// GET /api/v1/get/host
pub async fn get_host(State(state): State<ApiState>) -> Json<Envelope<HostInfo>> {
    Json(Envelope::new(HostInfo {
        hostname: state.hostname.to_string(),
        version: state.version.to_string(),
    }))
}

/// GET /api/v1/get/version
pub async fn get_version(State(state): State<ApiState>) -> Json<Envelope<String>> {
    Json(Envelope::new(state.version.to_string()))
}
