//! Runtime rate-limit configuration route handlers

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};
use tracing::info;
use verifier_core::rate_limit::RateLimitConfigPatch;
use verifier_core::RateLimitConfig;

use crate::api_handler::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/rate-limit-config
pub async fn get_config_handler(State(state): State<Arc<AppState>>) -> Json<RateLimitConfig> {
    Json(state.limiter.config())
}

/// POST /api/rate-limit-config
///
/// Accepts a partial configuration; each supplied field is range-checked
/// and a violation returns 400 naming the field. Updates take effect for
/// subsequent requests.
pub async fn update_config_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<Value>> {
    let body = body
        .map(|Json(value)| value)
        .ok_or_else(|| ApiError::BadRequest("Request body must be JSON".to_string()))?;

    let patch: RateLimitConfigPatch = serde_json::from_value(body)
        .map_err(|_| ApiError::BadRequest("Invalid rate limit configuration".to_string()))?;

    let config = state
        .limiter
        .update_config(&patch)
        .map_err(ApiError::BadRequest)?;

    info!(?config, "rate limit configuration updated");
    Ok(Json(json!({
        "message": "Rate limit configuration updated",
        "config": config,
    })))
}
