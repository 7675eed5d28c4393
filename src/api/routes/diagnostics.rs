//! Operational probes outside the monitoring protocol

use axum::{
    Json,
    extract::Path,
    http::{Method, StatusCode},
};

use crate::Envelope;

/// GET /api/v1/ping
pub async fn ping() -> Json<Envelope<&'static str>> {
    Json(Envelope::new("pong"))
}

/// GET /api/v1/echo/method
pub async fn echo_method(method: Method) -> Json<Envelope<String>> {
    Json(Envelope::new(method.to_string()))
}

/// ANY /api/v1/test/code/:code
///
/// Answers with the requested status and no body. Codes outside the fixed
/// set are 404.
pub async fn test_code(Path(code): Path<u16>) -> StatusCode {
    match code {
        200 => StatusCode::OK,
        401 => StatusCode::UNAUTHORIZED,
        404 => StatusCode::NOT_FOUND,
        405 => StatusCode::METHOD_NOT_ALLOWED,
        500 => StatusCode::INTERNAL_SERVER_ERROR,
        501 => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::NOT_FOUND,
    }
}
