//! Sliding-window rate limiting
//!
//! Process-wide limiter keyed by a caller identifier (typically the client
//! IP). Every check purges entries older than the window, counts the
//! remainder for the identifier, and either rejects or records the new
//! hit, atomically with respect to concurrent callers. Configuration is
//! mutable at runtime; updates take effect on subsequent checks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Runtime-mutable limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub requests_per_hour: u32,
    pub max_bulk_emails: usize,
    pub window_ms: u64,
    #[serde(rename = "blockDuration")]
    pub block_duration_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: 100,
            max_bulk_emails: 100,
            window_ms: 3_600_000,
            block_duration_ms: 3_600_000,
        }
    }
}

/// Partial configuration update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfigPatch {
    pub requests_per_hour: Option<u32>,
    pub max_bulk_emails: Option<usize>,
    pub window_ms: Option<u64>,
    #[serde(rename = "blockDuration")]
    pub block_duration_ms: Option<u64>,
}

impl RateLimitConfig {
    /// Apply a patch, validating each supplied field. The error message
    /// names the offending field.
    pub fn apply_patch(&mut self, patch: &RateLimitConfigPatch) -> Result<(), String> {
        if let Some(value) = patch.requests_per_hour {
            if !(1..=1000).contains(&value) {
                return Err("requestsPerHour must be between 1 and 1000".to_string());
            }
            self.requests_per_hour = value;
        }
        if let Some(value) = patch.max_bulk_emails {
            if !(1..=500).contains(&value) {
                return Err("maxBulkEmails must be between 1 and 500".to_string());
            }
            self.max_bulk_emails = value;
        }
        if let Some(value) = patch.window_ms {
            if !(60_000..=86_400_000).contains(&value) {
                return Err("windowMs must be between 60000 and 86400000".to_string());
            }
            self.window_ms = value;
        }
        if let Some(value) = patch.block_duration_ms {
            if !(300_000..=86_400_000).contains(&value) {
                return Err("blockDuration must be between 300000 and 86400000".to_string());
            }
            self.block_duration_ms = value;
        }
        Ok(())
    }
}

/// Outcome of one admission check, carrying everything the HTTP boundary
/// needs for the `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the current window ends, rounded up.
    pub reset_epoch_secs: u64,
}

pub struct RateLimiter {
    config: RwLock<RateLimitConfig>,
    hits: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: RwLock::new(config),
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config.read().expect("rate limit config poisoned").clone()
    }

    /// Validate and apply a partial update, returning the new config.
    pub fn update_config(&self, patch: &RateLimitConfigPatch) -> Result<RateLimitConfig, String> {
        let mut config = self.config.write().expect("rate limit config poisoned");
        let mut updated = config.clone();
        updated.apply_patch(patch)?;
        *config = updated.clone();
        Ok(updated)
    }

    /// Admission check for one identifier at the current time.
    pub fn check(&self, id: &str) -> RateLimitDecision {
        self.check_at(id, now_ms())
    }

    fn check_at(&self, id: &str, now_ms: u64) -> RateLimitDecision {
        let (limit, window_ms) = {
            let config = self.config.read().expect("rate limit config poisoned");
            (config.requests_per_hour, config.window_ms)
        };
        let cutoff = now_ms.saturating_sub(window_ms);
        let reset_epoch_secs = (now_ms + window_ms).div_ceil(1000);

        let mut hits = self.hits.lock().expect("rate limit map poisoned");

        // Drop identifiers whose newest hit fell out of the window so the
        // map stays bounded under sustained load.
        hits.retain(|_, queue| queue.back().is_some_and(|t| *t >= cutoff));

        let queue = hits.entry(id.to_string()).or_default();
        while queue.front().is_some_and(|t| *t < cutoff) {
            queue.pop_front();
        }

        let current = queue.len() as u32;
        if current >= limit {
            warn!(client = id, limit, "rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_epoch_secs,
            };
        }

        queue.push_back(now_ms);
        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit - (current + 1),
            reset_epoch_secs,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limiter(limit: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_hour: limit,
            window_ms,
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = limiter(3, 1_000);
        let now = 1_000_000;

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_at("10.0.0.1", now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = limiter.check_at("10.0.0.1", now + 10);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn admissions_resume_after_window_advances() {
        let limiter = limiter(2, 1_000);
        let now = 50_000;

        assert!(limiter.check_at("ip", now).allowed);
        assert!(limiter.check_at("ip", now + 1).allowed);
        assert!(!limiter.check_at("ip", now + 2).allowed);

        // One window later both hits have expired.
        assert!(limiter.check_at("ip", now + 1_001).allowed);
    }

    #[test]
    fn identifiers_are_isolated() {
        let limiter = limiter(1, 1_000);
        let now = 1_000;

        assert!(limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
        assert!(!limiter.check_at("a", now + 1).allowed);
    }

    #[test]
    fn reset_is_window_end_in_epoch_seconds_rounded_up() {
        let limiter = limiter(5, 60_000);
        let decision = limiter.check_at("ip", 1_500);
        assert_eq!(decision.reset_epoch_secs, 62); // ceil((1500 + 60000) / 1000)
    }

    #[test]
    fn expired_identifiers_are_evicted() {
        let limiter = limiter(5, 1_000);
        limiter.check_at("stale", 1_000);
        limiter.check_at("fresh", 10_000);

        let hits = limiter.hits.lock().unwrap();
        assert!(!hits.contains_key("stale"));
        assert!(hits.contains_key("fresh"));
    }

    #[test]
    fn config_update_takes_effect_for_subsequent_checks() {
        let limiter = limiter(1, 1_000);
        let now = 1_000;
        assert!(limiter.check_at("ip", now).allowed);
        assert!(!limiter.check_at("ip", now + 1).allowed);

        limiter
            .update_config(&RateLimitConfigPatch {
                requests_per_hour: Some(3),
                ..RateLimitConfigPatch::default()
            })
            .unwrap();

        assert!(limiter.check_at("ip", now + 2).allowed);
    }

    #[test]
    fn patch_validation_names_the_bad_field() {
        let mut config = RateLimitConfig::default();

        let err = config
            .apply_patch(&RateLimitConfigPatch {
                requests_per_hour: Some(0),
                ..RateLimitConfigPatch::default()
            })
            .unwrap_err();
        assert!(err.contains("requestsPerHour"));

        let err = config
            .apply_patch(&RateLimitConfigPatch {
                max_bulk_emails: Some(501),
                ..RateLimitConfigPatch::default()
            })
            .unwrap_err();
        assert!(err.contains("maxBulkEmails"));

        let err = config
            .apply_patch(&RateLimitConfigPatch {
                window_ms: Some(59_999),
                ..RateLimitConfigPatch::default()
            })
            .unwrap_err();
        assert!(err.contains("windowMs"));

        let err = config
            .apply_patch(&RateLimitConfigPatch {
                block_duration_ms: Some(86_400_001),
                ..RateLimitConfigPatch::default()
            })
            .unwrap_err();
        assert!(err.contains("blockDuration"));
    }

    #[test]
    fn failed_patch_leaves_config_unchanged() {
        let limiter = RateLimiter::with_defaults();
        let before = limiter.config();

        let result = limiter.update_config(&RateLimitConfigPatch {
            requests_per_hour: Some(50),
            window_ms: Some(10), // invalid
            ..RateLimitConfigPatch::default()
        });

        assert!(result.is_err());
        assert_eq!(limiter.config(), before);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(RateLimitConfig::default()).unwrap();
        assert!(json.get("requestsPerHour").is_some());
        assert!(json.get("maxBulkEmails").is_some());
        assert!(json.get("windowMs").is_some());
        assert!(json.get("blockDuration").is_some());
    }
}
