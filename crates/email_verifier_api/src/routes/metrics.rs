//! Metrics route handler

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use verifier_core::MetricsSnapshot;

use crate::AppState;

/// GET /api/metrics
///
/// Returns the metrics tracker snapshot: totals, rounded average
/// verification time, and the hourly/daily time series.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
