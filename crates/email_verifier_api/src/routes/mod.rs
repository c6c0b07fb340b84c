//! API Routes Module
//!
//! Endpoint groups:
//! - `validate`: single and bulk verification plus the batch-job endpoint
//! - `metrics`: metrics tracker snapshot
//! - `rate_limit`: runtime rate-limit configuration
//! - `health`: liveness check

pub mod health;
pub mod metrics;
pub mod rate_limit;
pub mod validate;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build all API routes with the shared application state applied.
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Verification endpoints
        .route("/api/validate-email", post(validate::validate_email_handler))
        .route("/api/validate-emails", post(validate::validate_emails_handler))
        .route(
            "/api/validate-emails/batch/:job_id",
            get(validate::batch_status_handler),
        )
        // Monitoring
        .route("/api/metrics", get(metrics::metrics_handler))
        // Runtime configuration
        .route(
            "/api/rate-limit-config",
            get(rate_limit::get_config_handler).post(rate_limit::update_config_handler),
        )
        // Liveness
        .route("/health", get(health::health_handler))
        .with_state(state)
}
