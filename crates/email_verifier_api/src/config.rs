//! Configuration management for the verification API
//!
//! Configuration is layered with figment: built-in defaults, then an
//! optional `Config.toml`, then `EMAIL_API_`-prefixed environment
//! variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use verifier_core::{RateLimitConfig, VerifierConfig};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub verification: VerificationConfig,
    pub rate_limit: RateLimitSettings,
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Verification pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Overall SMTP conversation deadline in seconds.
    pub smtp_timeout_secs: u64,
    /// Port the SMTP probe connects to on MX hosts.
    pub smtp_port: u16,
    /// Domain announced in HELO.
    pub helo_domain: String,
    /// DNS resolver timeout in milliseconds.
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts.
    pub dns_attempts: usize,
    /// DNS cache size (number of entries).
    pub dns_cache_size: usize,
    /// Minimum TTL for positive DNS cache entries in seconds.
    pub dns_min_ttl_secs: u64,
    /// Bloom filter false positive rate for the disposable set.
    pub bloom_filter_fp_rate: f64,
    /// Worker pool size for bulk verification; 0 picks a default from the
    /// machine's CPU count.
    pub max_workers: usize,
    /// Bulk requests larger than this are processed asynchronously
    /// through the job store instead of inline.
    pub inline_bulk_threshold: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            smtp_timeout_secs: 10,
            smtp_port: 25,
            helo_domain: "verify.local".to_string(),
            dns_timeout_ms: 2_000,
            dns_attempts: 2,
            dns_cache_size: 10_000,
            dns_min_ttl_secs: 60,
            bloom_filter_fp_rate: 0.0001,
            max_workers: 0,
            inline_bulk_threshold: 100,
        }
    }
}

impl VerificationConfig {
    pub fn to_verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            smtp_timeout: Duration::from_secs(self.smtp_timeout_secs),
            smtp_port: self.smtp_port,
            helo_domain: self.helo_domain.clone(),
            dns_timeout_ms: self.dns_timeout_ms,
            dns_attempts: self.dns_attempts,
            dns_cache_size: self.dns_cache_size,
            dns_min_ttl_secs: self.dns_min_ttl_secs,
            bloom_filter_fp_rate: self.bloom_filter_fp_rate,
        }
    }
}

/// Rate limiter defaults; mutable at runtime through the config endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Allowed verification requests per identifier per window.
    pub requests_per_hour: u32,
    /// Maximum addresses accepted in one bulk request.
    pub max_bulk_emails: usize,
    /// Sliding window length in milliseconds.
    pub window_ms: u64,
    /// Block duration surfaced through the config endpoint.
    pub block_duration_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_hour: 100,
            max_bulk_emails: 100,
            window_ms: 3_600_000,
            block_duration_ms: 3_600_000,
        }
    }
}

impl RateLimitSettings {
    pub fn to_core_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_hour: self.requests_per_hour,
            max_bulk_emails: self.max_bulk_emails,
            window_ms: self.window_ms,
            block_duration_ms: self.block_duration_ms,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging.
    pub json_logs: bool,
    /// Log level filter.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_documented_contract() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.verification.smtp_timeout_secs, 10);
        assert_eq!(config.verification.helo_domain, "verify.local");
        assert_eq!(config.verification.smtp_port, 25);
        assert_eq!(config.rate_limit.requests_per_hour, 100);
        assert_eq!(config.rate_limit.max_bulk_emails, 100);
        assert_eq!(config.rate_limit.window_ms, 3_600_000);
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn verifier_config_conversion_carries_every_field() {
        let config = VerificationConfig {
            smtp_timeout_secs: 7,
            helo_domain: "probe.example".to_string(),
            smtp_port: 2525,
            ..VerificationConfig::default()
        };
        let core = config.to_verifier_config();
        assert_eq!(core.smtp_timeout, Duration::from_secs(7));
        assert_eq!(core.helo_domain, "probe.example");
        assert_eq!(core.smtp_port, 2525);
        assert_eq!(core.dns_cache_size, 10_000);
    }

    #[test]
    fn rate_limit_settings_convert_to_core_config() {
        let settings = RateLimitSettings::default();
        let core = settings.to_core_config();
        assert_eq!(core.requests_per_hour, 100);
        assert_eq!(core.window_ms, 3_600_000);
    }
}
