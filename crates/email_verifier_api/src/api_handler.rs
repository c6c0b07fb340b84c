//! Shared API types and utilities
//!
//! Error-to-response mapping, client identification and the rate-limit
//! headers attached to every verification response.

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use verifier_core::RateLimitDecision;

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Request-shape and boundary errors. Verification failures never surface
/// here; they are delivered as HTTP 200 result records.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    RateLimited(RateLimitDecision),
    #[allow(dead_code)]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::RateLimited(decision) => (
                StatusCode::TOO_MANY_REQUESTS,
                rate_limit_headers(&decision),
                Json(json!({ "message": "Rate limit exceeded" })),
            )
                .into_response(),
            ApiError::Internal(message) => {
                tracing::error!("internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Headers emitted whenever the limiter was consulted for a request.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-ratelimit-limit",
        header_value(decision.limit.to_string()),
    );
    headers.insert(
        "x-ratelimit-remaining",
        header_value(decision.remaining.to_string()),
    );
    headers.insert(
        "x-ratelimit-reset",
        header_value(decision.reset_epoch_secs.to_string()),
    );
    headers
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Extract the client identifier for rate limiting: proxy headers in
/// order of preference, then the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: std::net::SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return ip.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    if let Some(cf_connecting_ip) = headers.get("cf-connecting-ip") {
        if let Ok(ip_str) = cf_connecting_ip.to_str() {
            return ip_str.to_string();
        }
    }

    peer.ip().to_string()
}
