//! In-memory bulk verification job store
//!
//! Bulk requests above the inline threshold are processed asynchronously:
//! the boundary creates a job row, a background task appends per-email
//! result rows as batches complete, and the batch endpoint serves the row
//! plus accumulated results.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use verifier_core::ResultRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub id: Uuid,
    pub status: JobStatus,
    pub total_emails: usize,
    pub processed_emails: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResultRow {
    pub job_id: Uuid,
    pub email: String,
    pub is_valid: bool,
    pub status: String,
    pub message: String,
    pub domain: String,
    pub mx_record: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct JobStore {
    inner: Mutex<HashMap<Uuid, (JobRow, Vec<JobResultRow>)>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, total_emails: usize, metadata: Value) -> JobRow {
        let now = Utc::now();
        let row = JobRow {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            total_emails,
            processed_emails: 0,
            created_at: now,
            updated_at: now,
            error: None,
            metadata,
        };
        self.inner
            .lock()
            .expect("job store poisoned")
            .insert(row.id, (row.clone(), Vec::new()));
        row
    }

    pub fn mark_processing(&self, id: Uuid) {
        self.update(id, |job, _| job.status = JobStatus::Processing);
    }

    /// Append one completed batch and bump the progress counter.
    pub fn append_results(&self, id: Uuid, records: &[ResultRecord]) {
        let now = Utc::now();
        self.update(id, |job, results| {
            for record in records {
                results.push(JobResultRow {
                    job_id: id,
                    email: record.email.clone().unwrap_or_default(),
                    is_valid: record.is_valid,
                    status: record.status.clone(),
                    message: record.message.clone(),
                    domain: record.domain.clone(),
                    mx_record: record.mx_record.clone(),
                    created_at: now,
                });
            }
            job.processed_emails += records.len();
        });
    }

    pub fn complete(&self, id: Uuid) {
        self.update(id, |job, _| job.status = JobStatus::Completed);
    }

    #[allow(dead_code)]
    pub fn fail(&self, id: Uuid, error: String) {
        self.update(id, |job, _| {
            job.status = JobStatus::Failed;
            job.error = Some(error);
        });
    }

    pub fn get(&self, id: Uuid) -> Option<(JobRow, Vec<JobResultRow>)> {
        self.inner.lock().expect("job store poisoned").get(&id).cloned()
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut JobRow, &mut Vec<JobResultRow>)) {
        if let Some((job, results)) = self.inner.lock().expect("job store poisoned").get_mut(&id) {
            apply(job, results);
            job.updated_at = Utc::now();
        }
    }
}
