//! Shared-secret check for pushed vectors
//!
//! The secret is compared byte for byte. There is no HMAC and the comparison
//! is not constant-time.

use axum::http::HeaderMap;

use crate::actors::master::AUTH_HEADER;

use super::error::ApiError;

/// Verify the `X-Atella-Auth` header against `expected`.
///
/// A missing header is treated as an empty secret.
pub fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let passed = headers
        .get(AUTH_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if passed != expected.as_bytes() {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}
