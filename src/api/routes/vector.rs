//! Aggregate vector endpoints

use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::{Method, StatusCode},
};
use tracing::{debug, error, instrument, warn};

use crate::api::{
    auth::verify_secret,
    error::{ApiError, ApiResult},
    state::ApiState,
    types::VectorForm,
};
use crate::{AggregateVector, Envelope, Vector};

/// GET /api/v1/get/vector
pub async fn get_vector(State(state): State<ApiState>) -> Json<Envelope<AggregateVector>> {
    Json(Envelope::new(state.aggregate.snapshot().await))
}

/// POST /api/v1/set/vector
///
/// Checks run in a fixed order: master role (406), method (405), shared
/// secret (401), form fields and vector JSON (500). The aggregate is only
/// touched when every check passes.
#[instrument(skip_all)]
pub async fn set_vector(State(state): State<ApiState>, request: Request) -> ApiResult<StatusCode> {
    if !state.is_master {
        return Err(ApiError::NotMaster);
    }

    if request.method() != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    if let Err(e) = verify_secret(request.headers(), &state.secret) {
        warn!("rejected vector push with a wrong secret");
        return Err(e);
    }

    let Form(form) = Form::<VectorForm>::from_request(request, &state)
        .await
        .map_err(|rejection| ApiError::Malformed(rejection.body_text()))?;

    if form.hostname.is_empty() || form.vector.is_empty() {
        return Err(ApiError::Malformed(
            "hostname and vector are required".to_string(),
        ));
    }

    let vector: Vector = serde_json::from_str(&form.vector).map_err(|e| {
        error!("malformed vector from {}: {e}", form.hostname);
        ApiError::Malformed(format!("malformed vector: {e}"))
    })?;

    debug!("received {} records from {}", vector.len(), form.hostname);
    state.aggregate.set_for_host(&form.hostname, vector).await;

    Ok(StatusCode::OK)
}
