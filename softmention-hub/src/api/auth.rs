//! API key guard for administrative routes
//!
//! Requests must carry the configured key in `x-api-key`. No key configured
//! means every request passes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication middleware
///
/// Applied to protected routes only; `/health`, `/inbox` and the public
/// software reads do not use it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(expected) {
        warn!(
            path = %request.uri().path(),
            key_present = provided.is_some(),
            "Rejected request with missing or wrong API key"
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
