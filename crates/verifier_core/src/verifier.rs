//! Verification pipeline orchestration
//!
//! Composes the pipeline for one address: rate-limit gate, syntax check,
//! disposable-domain check, concurrent DMARC lookup and SMTP probe, then
//! outcome synthesis. Every exit path, including quick rejects, emits a
//! metrics sample.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tracing::{debug, instrument};

use crate::disposable::DisposableDetector;
use crate::dns::DnsResolver;
use crate::domains::DomainTables;
use crate::metrics::MetricsTracker;
use crate::rate_limit::RateLimiter;
use crate::smtp::{self, Deliverability, SmtpStage, SmtpVerifier, StageLog};
use crate::status::{self, ResultRecord};
use crate::{VerificationOutcome, VerifierConfig, VerifyError};

pub struct EmailVerifier {
    resolver: DnsResolver,
    disposable: DisposableDetector,
    tables: DomainTables,
    smtp: SmtpVerifier,
    metrics: Arc<MetricsTracker>,
    limiter: Arc<RateLimiter>,
}

impl EmailVerifier {
    pub fn new(
        config: VerifierConfig,
        metrics: Arc<MetricsTracker>,
        limiter: Arc<RateLimiter>,
    ) -> anyhow::Result<Self> {
        let disposable = DisposableDetector::from_embedded_list(config.bloom_filter_fp_rate)?;
        let resolver = DnsResolver::new(
            config.dns_timeout_ms,
            config.dns_attempts,
            config.dns_cache_size,
            config.dns_min_ttl_secs,
        );
        let smtp = SmtpVerifier::new(
            config.helo_domain.clone(),
            config.smtp_timeout,
            config.smtp_port,
        );
        let tables = DomainTables::from_embedded_lists();

        debug!(
            disposable_domains = disposable.domain_count(),
            corporate_domains = tables.corporate_count(),
            "email verifier initialized"
        );

        Ok(Self {
            resolver,
            disposable,
            tables,
            smtp,
            metrics,
            limiter,
        })
    }

    pub fn tables(&self) -> &DomainTables {
        &self.tables
    }

    /// Gate on the rate limiter under the caller's identifier, then verify.
    pub async fn verify_for_client(&self, client_id: &str, email: &str) -> VerificationOutcome {
        if !self.limiter.check(client_id).allowed {
            let started = SystemTime::now();
            let outcome = quick_reject(VerifyError::RateLimitExceeded);
            self.metrics.record(started, false);
            return outcome;
        }
        self.verify(email).await
    }

    /// Run the pipeline for one address.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn verify(&self, email: &str) -> VerificationOutcome {
        let started = SystemTime::now();
        let timer = Instant::now();

        let mut outcome = self.run_pipeline(email).await;
        outcome.duration_ms = timer.elapsed().as_millis() as u64;

        self.metrics.record(started, outcome.is_conclusive());
        outcome
    }

    /// Verify and project straight into the public record.
    pub async fn verify_to_record(&self, email: &str) -> ResultRecord {
        let outcome = self.verify(email).await;
        status::to_record(email, &outcome, &self.tables)
    }

    async fn run_pipeline(&self, email: &str) -> VerificationOutcome {
        let Some(domain) = address_domain(email) else {
            return quick_reject(VerifyError::Format);
        };

        if self.disposable.is_disposable(&domain) {
            return quick_reject(VerifyError::Disposable);
        }

        // DMARC and SMTP proceed concurrently; a missing DMARC record is
        // never fatal to the verification.
        let (dmarc, probe) = tokio::join!(
            self.resolver.lookup_dmarc(&domain),
            self.smtp.verify(&self.resolver, email, &domain)
        );

        let is_corporate = self.tables.is_corporate(&domain);
        let mut outcome = match probe.disposition {
            Ok(Deliverability::Mailbox) => VerificationOutcome {
                valid: true,
                ..VerificationOutcome::default()
            },
            Ok(Deliverability::CatchAll) => VerificationOutcome {
                valid: is_corporate,
                is_catch_all: true,
                ..VerificationOutcome::default()
            },
            Err(err) => VerificationOutcome::failure(err),
        };

        outcome.mx_record = probe.mx_record;
        outcome.dmarc_policy = dmarc.map(|record| record.policy);
        outcome.is_corporate = is_corporate;
        outcome.logs = probe.logs;
        outcome
    }
}

/// Outcome for a pipeline exit before any SMTP stage could run. A failed
/// connect-stage entry keeps the stage log non-empty on every path.
fn quick_reject(error: VerifyError) -> VerificationOutcome {
    let now = smtp::now_ms();
    let mut outcome = VerificationOutcome::failure(error);
    outcome.logs.push(StageLog {
        stage: SmtpStage::Connect,
        start_time: now,
        end_time: now,
        success: false,
        error: outcome.error.as_ref().map(|e| e.tag().to_string()),
        request: None,
        response: None,
    });
    outcome
}

/// Coarse address shape check: one `@`, no whitespace, non-empty local
/// part, and a dot with characters on both sides inside the domain.
/// Returns the lowercased domain on success.
fn address_domain(email: &str) -> Option<String> {
    if email.chars().any(char::is_whitespace) {
        return None;
    }
    if email.matches('@').count() != 1 {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() {
        return None;
    }
    let has_interior_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i >= 1 && i + 1 < domain.len());
    if !has_interior_dot {
        return None;
    }
    Some(domain.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn verifier() -> EmailVerifier {
        EmailVerifier::new(
            VerifierConfig::default(),
            Arc::new(MetricsTracker::new()),
            Arc::new(RateLimiter::with_defaults()),
        )
        .unwrap()
    }

    #[test]
    fn address_shape_acceptance() {
        assert_eq!(address_domain("user@example.com"), Some("example.com".to_string()));
        assert_eq!(address_domain("a.b+c@sub.Example.COM"), Some("sub.example.com".to_string()));

        assert_eq!(address_domain("notanemail"), None);
        assert_eq!(address_domain("no domain@example.com"), None);
        assert_eq!(address_domain("two@@example.com"), None);
        assert_eq!(address_domain("@example.com"), None);
        assert_eq!(address_domain("user@nodot"), None);
        assert_eq!(address_domain("user@.com"), None);
        assert_eq!(address_domain("user@com."), None);
        assert_eq!(address_domain("user@example.com "), None);
    }

    #[tokio::test]
    async fn malformed_address_is_rejected_before_any_network_io() {
        let outcome = verifier().verify("notanemail").await;

        assert!(!outcome.valid);
        assert!(matches!(outcome.error, Some(VerifyError::Format)));
        assert_eq!(outcome.reason.as_deref(), Some("Invalid email format"));
        assert!(!outcome.logs.is_empty());
        assert!(!outcome.logs[0].success);
    }

    #[tokio::test]
    async fn disposable_domain_is_rejected_before_any_network_io() {
        let outcome = verifier().verify("user@mailinator.com").await;

        assert!(!outcome.valid);
        assert!(matches!(outcome.error, Some(VerifyError::Disposable)));
        assert_eq!(outcome.logs[0].error.as_deref(), Some("disposable"));
    }

    #[tokio::test]
    async fn quick_rejects_emit_metrics_samples() {
        let metrics = Arc::new(MetricsTracker::new());
        let verifier = EmailVerifier::new(
            VerifierConfig::default(),
            metrics.clone(),
            Arc::new(RateLimiter::with_defaults()),
        )
        .unwrap();

        verifier.verify("notanemail").await;
        verifier.verify("user@temp-mail.org").await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_validations, 2);
        assert_eq!(snapshot.failed_validations, 2);
    }

    #[tokio::test]
    async fn rate_limit_gate_fails_fast() {
        let limiter = Arc::new(RateLimiter::new(crate::RateLimitConfig {
            requests_per_hour: 1,
            ..crate::RateLimitConfig::default()
        }));
        let verifier = EmailVerifier::new(
            VerifierConfig::default(),
            Arc::new(MetricsTracker::new()),
            limiter,
        )
        .unwrap();

        let first = verifier.verify_for_client("10.0.0.1", "notanemail").await;
        assert!(matches!(first.error, Some(VerifyError::Format)));

        let second = verifier.verify_for_client("10.0.0.1", "notanemail").await;
        assert!(matches!(second.error, Some(VerifyError::RateLimitExceeded)));
        assert_eq!(second.reason.as_deref(), Some("Rate limit exceeded"));

        // A different caller is unaffected.
        let other = verifier.verify_for_client("10.0.0.2", "notanemail").await;
        assert!(matches!(other.error, Some(VerifyError::Format)));
    }

    #[tokio::test]
    async fn record_projection_round_trip() {
        let record = verifier().verify_to_record("bob.smith@nodot").await;
        assert_eq!(record.status, "invalid");
        assert_eq!(record.sub_status.as_deref(), Some("format_error"));
        assert_eq!(record.first_name, "Bob");
        assert_eq!(record.last_name, "Smith");
    }
}
