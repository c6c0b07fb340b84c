//! MX and DMARC resolution using hickory-resolver
//!
//! Two lookups feed the verification pipeline: the MX record set of the
//! recipient domain (sorted by priority) and the DMARC policy published
//! at `_dmarc.<domain>`. DMARC failures are never fatal.

use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    proto::op::ResponseCode,
    AsyncResolver, TokioAsyncResolver,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::VerifyError;

/// One `(priority, exchange)` pair from the MX record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxHost {
    pub priority: u16,
    pub exchange: String,
}

/// Parsed DMARC policy record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmarcRecord {
    /// `p=` tag; defaults to `none` when the tag is missing.
    pub policy: String,
    /// `sp=` tag, when present.
    pub subdomain_policy: Option<String>,
    /// `pct=` tag; defaults to 100.
    pub percentage: u8,
    /// `rf=` tag, when present.
    pub report_format: Option<String>,
}

/// DNS resolver wrapper scoped to the two lookups the pipeline needs.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(timeout_ms: u64, attempts: usize, cache_size: usize, min_ttl_secs: u64) -> Self {
        let config = ResolverConfig::cloudflare();

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_millis(timeout_ms);
        opts.attempts = attempts;
        opts.cache_size = cache_size;
        opts.positive_min_ttl = Some(Duration::from_secs(min_ttl_secs));
        opts.negative_min_ttl = Some(Duration::from_secs(30));
        opts.positive_max_ttl = Some(Duration::from_secs(3600));

        let resolver = AsyncResolver::tokio(config, opts);

        debug!(
            "DNS resolver initialized - timeout: {}ms, attempts: {}, cache_size: {}",
            timeout_ms, attempts, cache_size
        );

        Self { resolver }
    }

    /// Look up the MX record set for a domain, sorted ascending by priority.
    ///
    /// An answer with zero MX records maps to [`VerifyError::NoMxRecords`];
    /// NXDOMAIN, SERVFAIL and timeouts map to [`VerifyError::Dns`]. There
    /// is no retry beyond what the resolver itself performs.
    pub async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, VerifyError> {
        debug!("Looking up MX records for domain: {}", domain);

        let lookup = match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => lookup,
            Err(err) => {
                return match err.kind() {
                    ResolveErrorKind::NoRecordsFound { response_code, .. } => {
                        if *response_code == ResponseCode::NoError {
                            Err(VerifyError::NoMxRecords)
                        } else {
                            Err(VerifyError::Dns(response_code.to_string()))
                        }
                    }
                    _ => Err(VerifyError::Dns(err.to_string())),
                };
            }
        };

        let mut hosts: Vec<MxHost> = lookup
            .iter()
            .map(|mx| MxHost {
                priority: mx.preference(),
                exchange: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
            })
            .collect();

        if hosts.is_empty() {
            debug!("Domain {} has no MX records", domain);
            return Err(VerifyError::NoMxRecords);
        }

        hosts.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.exchange.cmp(&b.exchange))
        });

        debug!("Domain {} has {} MX record(s)", domain, hosts.len());
        Ok(hosts)
    }

    /// Look up and parse the DMARC record at `_dmarc.<domain>`.
    ///
    /// Returns `None` on missing records and on lookup failure alike;
    /// DMARC is advisory and must not fail a verification.
    pub async fn lookup_dmarc(&self, domain: &str) -> Option<DmarcRecord> {
        let dmarc_domain = format!("_dmarc.{}", domain);
        debug!("Checking DMARC record at: {}", dmarc_domain);

        let lookup = match self.resolver.txt_lookup(&dmarc_domain).await {
            Ok(lookup) => lookup,
            Err(err) => {
                debug!("DMARC lookup failed for {}: {}", domain, err);
                return None;
            }
        };

        for record in lookup.iter() {
            // A TXT record may be split into character-string segments;
            // segments are joined without a separator before parsing.
            let joined: String = record
                .txt_data()
                .iter()
                .map(|data| String::from_utf8_lossy(data).to_string())
                .collect::<Vec<_>>()
                .join("");

            if let Some(parsed) = parse_dmarc_record(&joined) {
                debug!("Found DMARC record for {}: {}", domain, joined);
                return Some(parsed);
            }
        }

        debug!("No DMARC record found for {}", domain);
        None
    }
}

/// Parse the value of one TXT record into a [`DmarcRecord`].
///
/// Returns `None` unless the value begins with `v=DMARC1`.
pub fn parse_dmarc_record(value: &str) -> Option<DmarcRecord> {
    let trimmed = value.trim();
    if !trimmed.to_ascii_lowercase().starts_with("v=dmarc1") {
        return None;
    }

    let mut policy = None;
    let mut subdomain_policy = None;
    let mut percentage = None;
    let mut report_format = None;

    for tag in trimmed.split(';') {
        let tag = tag.trim();
        if let Some(value) = tag.strip_prefix("p=") {
            policy = Some(value.trim().to_string());
        } else if let Some(value) = tag.strip_prefix("sp=") {
            subdomain_policy = Some(value.trim().to_string());
        } else if let Some(value) = tag.strip_prefix("pct=") {
            match value.trim().parse::<u8>() {
                Ok(pct) if pct <= 100 => percentage = Some(pct),
                _ => warn!("Ignoring out-of-range DMARC pct tag: {}", value),
            }
        } else if let Some(value) = tag.strip_prefix("rf=") {
            report_format = Some(value.trim().to_string());
        }
    }

    Some(DmarcRecord {
        policy: policy.unwrap_or_else(|| "none".to_string()),
        subdomain_policy,
        percentage: percentage.unwrap_or(100),
        report_format,
    })
}
