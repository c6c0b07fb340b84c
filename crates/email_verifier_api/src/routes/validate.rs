//! Single and bulk verification route handlers
//!
//! Verification failures are always HTTP 200 with a descriptive result
//! record; 4xx responses are reserved for request-shape problems and rate
//! limiting.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api_handler::{client_ip, rate_limit_headers, ApiError, ApiResult};
use crate::jobs::{JobResultRow, JobRow};
use crate::AppState;

/// POST /api/validate-email
///
/// Body `{"email": "<address>"}`. Returns a single result record.
#[instrument(skip_all, fields(client))]
pub async fn validate_email_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> ApiResult<Response> {
    let client = client_ip(&headers, peer);
    tracing::Span::current().record("client", client.as_str());

    let decision = state.limiter.check(&client);
    if !decision.allowed {
        return Err(ApiError::RateLimited(decision));
    }

    let body = body.map(|Json(value)| value);
    let email = extract_email(body.as_ref())?;

    info!(email = %email, "validating email");
    let record = state.verifier.verify_to_record(&email).await;

    Ok((rate_limit_headers(&decision), Json(record)).into_response())
}

/// POST /api/validate-emails
///
/// Body `{"emails": ["<address>", ...]}`. Returns result records aligned
/// to input order. Batches above the inline threshold are handed to the
/// job store and processed asynchronously.
#[instrument(skip_all, fields(client, count))]
pub async fn validate_emails_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> ApiResult<Response> {
    let client = client_ip(&headers, peer);
    tracing::Span::current().record("client", client.as_str());

    let decision = state.limiter.check(&client);
    if !decision.allowed {
        return Err(ApiError::RateLimited(decision));
    }

    let body = body.map(|Json(value)| value);
    let emails = extract_emails(body.as_ref())?;
    tracing::Span::current().record("count", emails.len());

    let max_bulk = state.limiter.config().max_bulk_emails;
    if emails.len() > max_bulk {
        return Err(ApiError::BadRequest(format!(
            "Maximum {} emails allowed per request",
            max_bulk
        )));
    }

    if emails.len() > state.config.verification.inline_bulk_threshold {
        let job = state.jobs.create(
            emails.len(),
            serde_json::json!({ "client": client, "inline": false }),
        );
        info!(job_id = %job.id, count = emails.len(), "bulk verification deferred to job");
        spawn_job_processing(state.clone(), job.id, emails);
        return Ok((rate_limit_headers(&decision), Json(job)).into_response());
    }

    info!(count = emails.len(), "bulk verification inline");
    let records = state.pool.verify_batch(&emails).await;

    Ok((rate_limit_headers(&decision), Json(records)).into_response())
}

/// GET /api/validate-emails/batch/:job_id
pub async fn batch_status_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusResponse>> {
    let (job, results) = state
        .jobs
        .get(job_id)
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    Ok(Json(JobStatusResponse { job, results }))
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    #[serde(flatten)]
    pub job: JobRow,
    pub results: Vec<JobResultRow>,
}

fn extract_email(body: Option<&Value>) -> Result<String, ApiError> {
    let body = body.ok_or_else(|| ApiError::BadRequest("Request body must be JSON".to_string()))?;
    body.get("email")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Email is required and must be a string".to_string()))
}

fn extract_emails(body: Option<&Value>) -> Result<Vec<String>, ApiError> {
    let body = body.ok_or_else(|| ApiError::BadRequest("Request body must be JSON".to_string()))?;
    let values = body
        .get("emails")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::BadRequest("Emails must be an array".to_string()))?;

    values
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest("Emails must be an array of strings".to_string()))
        })
        .collect()
}

/// Drive one deferred bulk job to completion in the background.
fn spawn_job_processing(state: Arc<AppState>, job_id: Uuid, emails: Vec<String>) {
    const BATCH_SIZE: usize = 10;

    tokio::spawn(async move {
        state.jobs.mark_processing(job_id);
        for chunk in emails.chunks(BATCH_SIZE) {
            let records = state.pool.verify_batch(chunk).await;
            state.jobs.append_results(job_id, &records);
        }
        state.jobs.complete(job_id);
        info!(job_id = %job_id, "bulk verification job completed");
    });
}
