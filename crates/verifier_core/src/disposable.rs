//! Disposable domain detection
//!
//! Membership in the disposable-domain set is checked through a Bloom
//! filter built once at startup from the embedded list. Domains on the
//! list are always flagged; the false-positive rate for other domains is
//! bounded by the configured rate.

use anyhow::{anyhow, Result};
use fastbloom::BloomFilter;
use std::collections::HashSet;
use tracing::{debug, info};

/// The disposable-domain list shipped with the crate.
const EMBEDDED_LIST: &str = include_str!("../../../disposable_domains.txt");

pub struct DisposableDetector {
    bloom_filter: BloomFilter,
    domain_count: usize,
}

impl DisposableDetector {
    /// Build a detector from an explicit list of domains.
    pub fn new<I>(domains: I, false_positive_rate: f64) -> Result<Self>
    where
        I: Iterator<Item = String>,
    {
        let domains: Vec<String> = domains.map(|d| d.to_lowercase()).collect();
        let domain_count = domains.len();
        if domain_count == 0 {
            return Err(anyhow!("No domains provided for disposable detection"));
        }

        let bloom_filter = BloomFilter::with_false_pos(false_positive_rate).items(domains);

        info!(
            "Disposable detector initialized with {} domains, {:.4}% false positive rate",
            domain_count,
            false_positive_rate * 100.0
        );

        Ok(Self {
            bloom_filter,
            domain_count,
        })
    }

    /// Build a detector from the embedded `disposable_domains.txt`.
    pub fn from_embedded_list(false_positive_rate: f64) -> Result<Self> {
        let domains = parse_domain_list(EMBEDDED_LIST)?;
        Self::new(domains.into_iter(), false_positive_rate)
    }

    /// Case-insensitive membership check.
    pub fn is_disposable(&self, domain: &str) -> bool {
        let normalized = domain.to_lowercase();
        let result = self.bloom_filter.contains(&normalized);
        if result {
            debug!("Domain '{}' flagged as disposable", domain);
        }
        result
    }

    pub fn domain_count(&self) -> usize {
        self.domain_count
    }
}

/// Parse a domain-per-line list, skipping blanks and `#` comments.
pub(crate) fn parse_domain_list(content: &str) -> Result<HashSet<String>> {
    let domains: HashSet<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_lowercase())
        .collect();

    if domains.is_empty() {
        return Err(anyhow!("No valid domains found in list"));
    }
    Ok(domains)
}
