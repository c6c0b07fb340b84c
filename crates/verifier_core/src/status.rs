//! Projection of verification outcomes into the public result record
//!
//! A pure mapping: the internal outcome plus the original address in, the
//! wire-stable record out. Every field is always present; missing data is
//! represented as `"Unknown"` or `null`, never by omission, so downstream
//! serialisation is stable across all code paths.

use serde::Serialize;

use crate::domains::DomainTables;
use crate::{VerificationOutcome, VerifyError};

/// The public result record, the contract with callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// One of `valid`, `invalid`, `catch-all`, `error`.
    pub status: String,
    pub sub_status: Option<String>,
    pub account: String,
    pub domain: String,
    /// `"Yes"` exactly when `mx_record` is set.
    pub mx_found: String,
    pub mx_record: Option<String>,
    /// Leading dot-separated label of the MX host, or `"Unknown"`.
    pub smtp_provider: String,
    pub dmarc_policy: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// `"Yes"`, `"No"`, or `"Unknown"` when the domain itself is unknown.
    pub free_email: String,
    /// Reserved; always `"Unknown"` until a typo-correction module exists.
    pub did_you_mean: String,
    pub message: String,
    pub is_valid: bool,
    /// Original input address; attached on bulk results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Map one outcome to the public record.
pub fn to_record(email: &str, outcome: &VerificationOutcome, tables: &DomainTables) -> ResultRecord {
    let (account, domain) = split_address(email);
    let (first_name, last_name) = extract_name(&account);

    // A syntax-rejected address never has a trustworthy domain.
    let free_email = match &domain {
        _ if matches!(outcome.error, Some(VerifyError::Format)) => "Unknown".to_string(),
        None => "Unknown".to_string(),
        Some(domain) => {
            if tables.is_free_provider(domain) {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }
    };

    let (status, sub_status, is_valid, fallback_message) = classify(outcome);
    let message = outcome
        .reason
        .clone()
        .unwrap_or_else(|| fallback_message.to_string());

    let smtp_provider = outcome
        .mx_record
        .as_deref()
        .and_then(|mx| mx.split('.').next())
        .map(|label| label.to_lowercase())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    ResultRecord {
        status: status.to_string(),
        sub_status: sub_status.map(str::to_string),
        account,
        domain: domain.unwrap_or_else(|| "Unknown".to_string()),
        mx_found: if outcome.mx_record.is_some() { "Yes" } else { "No" }.to_string(),
        mx_record: outcome.mx_record.clone(),
        smtp_provider,
        dmarc_policy: outcome.dmarc_policy.clone(),
        first_name,
        last_name,
        free_email,
        did_you_mean: "Unknown".to_string(),
        message,
        is_valid,
        email: None,
    }
}

/// The record the pool boundary emits when a worker dies unexpectedly.
pub fn system_error_record(email: &str, tables: &DomainTables) -> ResultRecord {
    let outcome =
        VerificationOutcome::failure(VerifyError::System("verification worker failed".to_string()));
    to_record(email, &outcome, tables)
}

fn classify(outcome: &VerificationOutcome) -> (&'static str, Option<&'static str>, bool, &'static str) {
    match &outcome.error {
        None if !outcome.is_catch_all => ("valid", None, true, "Valid email address"),
        None if outcome.is_corporate => (
            "catch-all",
            None,
            true,
            "Valid corporate email domain with catch-all configuration",
        ),
        None => (
            "invalid",
            Some("catch_all_detected"),
            false,
            "Catch-all domain detected; mailbox existence cannot be confirmed",
        ),
        Some(VerifyError::System(_)) => ("error", Some("system_error"), false, "Internal error"),
        Some(err) => ("invalid", Some(err.tag()), false, "Verification failed"),
    }
}

/// Split on the last `@`. Returns the account and, when present, the domain.
fn split_address(email: &str) -> (String, Option<String>) {
    match email.rsplit_once('@') {
        Some((account, domain)) if !domain.is_empty() => {
            (account.to_string(), Some(domain.to_string()))
        }
        _ => (email.to_string(), None),
    }
}

/// Derive a display name from the local part: `.` and `_` become spaces,
/// each part is capitalised, first part is the first name and the rest
/// join into the last name.
fn extract_name(account: &str) -> (String, String) {
    let cleaned = account.replace(['.', '_'], " ");
    let parts: Vec<String> = cleaned.split_whitespace().map(capitalize).collect();

    match parts.len() {
        0 => ("Unknown".to_string(), "Unknown".to_string()),
        1 => (parts[0].clone(), "Unknown".to_string()),
        _ => (parts[0].clone(), parts[1..].join(" ")),
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
