//! # verifier_core
//!
//! Email deliverability verification pipeline. Composes DNS lookups, an
//! SMTP conversation against the recipient's mail exchanger, a DMARC
//! policy probe and catch-all detection into a single result record.
//!
//! ## Features
//!
//! - **MX resolution** with priority ordering via hickory-resolver
//! - **SMTP mailbox probing** driven by an explicit state machine with a
//!   single overall deadline and per-stage logging
//! - **Catch-all detection** using a high-entropy probe recipient
//! - **Disposable domain detection** using a Bloom filter
//! - **Sliding-window rate limiting** keyed by caller identifier
//! - **Bounded worker pool** for bulk verification under backpressure
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use verifier_core::{EmailVerifier, MetricsTracker, RateLimiter, VerifierConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let metrics = Arc::new(MetricsTracker::new());
//!     let limiter = Arc::new(RateLimiter::with_defaults());
//!     let verifier = EmailVerifier::new(VerifierConfig::default(), metrics, limiter)?;
//!
//!     let record = verifier.verify_to_record("someone@example.com").await;
//!     println!("{} -> {}", record.status, record.is_valid);
//!     Ok(())
//! }
//! ```

pub mod disposable;
pub mod dns;
pub mod domains;
pub mod metrics;
pub mod pool;
pub mod rate_limit;
pub mod smtp;
pub mod status;
pub mod verifier;

use std::time::Duration;

use thiserror::Error;

/// Configuration for the verification pipeline.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Overall deadline for one SMTP conversation, connect to terminal state.
    pub smtp_timeout: Duration,
    /// Port the SMTP probe connects to on the MX host.
    pub smtp_port: u16,
    /// Domain announced in HELO; an opaque value that does not need to resolve.
    pub helo_domain: String,
    /// DNS resolver timeout in milliseconds.
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts.
    pub dns_attempts: usize,
    /// DNS cache size (number of entries).
    pub dns_cache_size: usize,
    /// Minimum TTL for positive DNS cache entries.
    pub dns_min_ttl_secs: u64,
    /// Bloom filter false positive rate for the disposable-domain set.
    pub bloom_filter_fp_rate: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            smtp_timeout: Duration::from_secs(10),
            smtp_port: 25,
            helo_domain: "verify.local".to_string(),
            dns_timeout_ms: 2_000,
            dns_attempts: 2,
            dns_cache_size: 10_000,
            dns_min_ttl_secs: 60,
            bloom_filter_fp_rate: 0.0001,
        }
    }
}

/// Everything that can make a verification come back negative.
///
/// The `Display` strings double as the human-readable `message` in the
/// public result record; [`VerifyError::tag`] yields the machine-readable
/// sub-status.
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    #[error("Invalid email format")]
    Format,
    #[error("Disposable email addresses are not allowed")]
    Disposable,
    #[error("DNS lookup failed: {0}")]
    Dns(String),
    #[error("No valid MX records found")]
    NoMxRecords,
    #[error("Connection to mail server failed: {0}")]
    Connection(String),
    #[error("Verification timed out")]
    Timeout,
    #[error("Unexpected SMTP greeting: {0}")]
    Greeting(String),
    #[error("HELO rejected: {0}")]
    Helo(String),
    #[error("MAIL FROM rejected: {0}")]
    MailFrom(String),
    #[error("RCPT TO failed: {0}")]
    RcptTo(String),
    #[error("Mailbox does not exist")]
    MailboxNotFound,
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Internal error: {0}")]
    System(String),
    #[error("Unexpected SMTP failure: {0}")]
    Unknown(String),
}

impl VerifyError {
    /// Stable lower-snake tag used as `subStatus` in the public record.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Format => "format_error",
            Self::Disposable => "disposable",
            Self::Dns(_) => "dns_error",
            Self::NoMxRecords => "no_mx_record",
            Self::Connection(_) => "connection_error",
            Self::Timeout => "timeout_error",
            Self::Greeting(_) => "greeting_error",
            Self::Helo(_) => "helo_error",
            Self::MailFrom(_) => "mail_from_error",
            Self::RcptTo(_) => "rcpt_to_error",
            Self::MailboxNotFound => "mailbox_not_found",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::System(_) => "system_error",
            Self::Unknown(_) => "unknown_error",
        }
    }
}

/// Internal outcome of one verification, before projection into the
/// public result record.
#[derive(Debug, Clone, Default)]
pub struct VerificationOutcome {
    /// Whether the mailbox is considered deliverable.
    pub valid: bool,
    /// The error that ended the pipeline, if any.
    pub error: Option<VerifyError>,
    /// Human-readable reason mirrored into the public `message`.
    pub reason: Option<String>,
    /// Exchange host of the primary MX record, when resolved.
    pub mx_record: Option<String>,
    /// DMARC policy of the recipient domain, when published.
    pub dmarc_policy: Option<String>,
    /// The MX accepted a recipient that cannot exist.
    pub is_catch_all: bool,
    /// The recipient domain is on the corporate allow-list.
    pub is_corporate: bool,
    /// SMTP stage log, in entry order.
    pub logs: Vec<smtp::StageLog>,
    /// Wall-clock duration of the whole verification.
    pub duration_ms: u64,
}

impl VerificationOutcome {
    pub(crate) fn failure(error: VerifyError) -> Self {
        Self {
            reason: Some(error.to_string()),
            error: Some(error),
            ..Self::default()
        }
    }

    /// A verification counts as successful for metrics purposes when it
    /// produced a deliverability answer, including "mailbox not found".
    pub fn is_conclusive(&self) -> bool {
        match &self.error {
            None => true,
            Some(VerifyError::MailboxNotFound) => true,
            Some(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

pub use dns::{DmarcRecord, DnsResolver, MxHost};
pub use domains::DomainTables;
pub use metrics::{MetricsSnapshot, MetricsTracker};
pub use pool::{Verify, WorkerPool};
pub use rate_limit::{RateLimitConfig, RateLimitConfigPatch, RateLimitDecision, RateLimiter};
pub use smtp::{SmtpStage, StageLog};
pub use status::ResultRecord;
pub use verifier::EmailVerifier;
