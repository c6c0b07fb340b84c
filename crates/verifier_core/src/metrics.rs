//! Verification metrics tracking
//!
//! Append-only sink fed one `(startTime, success)` sample per finished
//! verification. Keeps process totals plus hour- and day-aligned buckets
//! with bounded retention (24 hours, 30 days).

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

const HOUR_MS: u64 = 3_600_000;
const DAY_MS: u64 = 86_400_000;
const HOURLY_RETENTION: usize = 24;
const DAILY_RETENTION: usize = 30;

#[derive(Debug, Default)]
struct Bucket {
    validations: u64,
    successes: u64,
    total_duration_ms: u64,
}

#[derive(Debug, Default)]
struct MetricsInner {
    total: u64,
    successful: u64,
    failed: u64,
    total_duration_ms: u64,
    hourly: BTreeMap<u64, Bucket>,
    daily: BTreeMap<u64, Bucket>,
}

/// Point-in-time export of the tracker, shaped for the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_validations: u64,
    pub successful_validations: u64,
    pub failed_validations: u64,
    /// Milliseconds, rounded.
    pub average_validation_time: u64,
    pub hourly_metrics: Vec<TimeSeriesEntry>,
    pub daily_metrics: Vec<TimeSeriesEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesEntry {
    /// Bucket-aligned milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub validations: u64,
    /// Percentage of successful verifications in the bucket, 0-100.
    pub success_rate: f64,
    /// Average verification duration in the bucket, milliseconds, rounded.
    pub average_time: u64,
}

#[derive(Default)]
pub struct MetricsTracker {
    inner: Mutex<MetricsInner>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished verification.
    pub fn record(&self, started_at: SystemTime, success: bool) {
        let now = SystemTime::now();
        let duration_ms = now
            .duration_since(started_at)
            .unwrap_or_default()
            .as_millis() as u64;
        let now_ms = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.record_at(now_ms, duration_ms, success);
    }

    fn record_at(&self, now_ms: u64, duration_ms: u64, success: bool) {
        let mut inner = self.inner.lock().expect("metrics poisoned");
        let inner = &mut *inner;

        inner.total += 1;
        if success {
            inner.successful += 1;
        } else {
            inner.failed += 1;
        }
        inner.total_duration_ms += duration_ms;

        let hour_key = now_ms - now_ms % HOUR_MS;
        let day_key = now_ms - now_ms % DAY_MS;
        for (map, key, retention) in [
            (&mut inner.hourly, hour_key, HOURLY_RETENTION),
            (&mut inner.daily, day_key, DAILY_RETENTION),
        ] {
            let bucket = map.entry(key).or_default();
            bucket.validations += 1;
            if success {
                bucket.successes += 1;
            }
            bucket.total_duration_ms += duration_ms;
            while map.len() > retention {
                map.pop_first();
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("metrics poisoned");

        let average_validation_time = if inner.total == 0 {
            0
        } else {
            ((inner.total_duration_ms as f64) / (inner.total as f64)).round() as u64
        };

        MetricsSnapshot {
            total_validations: inner.total,
            successful_validations: inner.successful,
            failed_validations: inner.failed,
            average_validation_time,
            hourly_metrics: export_series(&inner.hourly),
            daily_metrics: export_series(&inner.daily),
        }
    }
}

fn export_series(buckets: &BTreeMap<u64, Bucket>) -> Vec<TimeSeriesEntry> {
    buckets
        .iter()
        .map(|(timestamp, bucket)| {
            let success_rate = if bucket.validations == 0 {
                0.0
            } else {
                let rate = (bucket.successes as f64) / (bucket.validations as f64) * 100.0;
                (rate * 100.0).round() / 100.0
            };
            let average_time = ((bucket.total_duration_ms as f64) / (bucket.validations as f64))
                .round() as u64;
            TimeSeriesEntry {
                timestamp: *timestamp,
                validations: bucket.validations,
                success_rate,
                average_time,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn totals_and_average_accumulate() {
        let tracker = MetricsTracker::new();
        tracker.record_at(HOUR_MS, 100, true);
        tracker.record_at(HOUR_MS + 1, 200, true);
        tracker.record_at(HOUR_MS + 2, 301, false);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_validations, 3);
        assert_eq!(snapshot.successful_validations, 2);
        assert_eq!(snapshot.failed_validations, 1);
        assert_eq!(snapshot.average_validation_time, 200); // round(601 / 3)
    }

    #[test]
    fn buckets_align_to_hour_and_day_boundaries() {
        let tracker = MetricsTracker::new();
        let now = DAY_MS * 3 + HOUR_MS * 5 + 123_456;
        tracker.record_at(now, 50, true);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.hourly_metrics.len(), 1);
        assert_eq!(snapshot.hourly_metrics[0].timestamp, DAY_MS * 3 + HOUR_MS * 5);
        assert_eq!(snapshot.daily_metrics[0].timestamp, DAY_MS * 3);
    }

    #[test]
    fn success_rate_is_a_rounded_percentage() {
        let tracker = MetricsTracker::new();
        tracker.record_at(HOUR_MS, 10, true);
        tracker.record_at(HOUR_MS + 1, 10, true);
        tracker.record_at(HOUR_MS + 2, 10, false);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.hourly_metrics[0].success_rate, 66.67);
    }

    #[test]
    fn hourly_retention_keeps_last_24_buckets() {
        let tracker = MetricsTracker::new();
        for hour in 0..30u64 {
            tracker.record_at(hour * HOUR_MS, 10, true);
        }

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.hourly_metrics.len(), 24);
        assert_eq!(snapshot.hourly_metrics[0].timestamp, 6 * HOUR_MS);
    }

    #[test]
    fn daily_retention_keeps_last_30_buckets() {
        let tracker = MetricsTracker::new();
        for day in 0..40u64 {
            tracker.record_at(day * DAY_MS, 10, true);
        }

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.daily_metrics.len(), 30);
        assert_eq!(snapshot.daily_metrics[0].timestamp, 10 * DAY_MS);
    }

    #[test]
    fn empty_tracker_snapshot_is_zeroed() {
        let snapshot = MetricsTracker::new().snapshot();
        assert_eq!(snapshot.total_validations, 0);
        assert_eq!(snapshot.average_validation_time, 0);
        assert!(snapshot.hourly_metrics.is_empty());
        assert!(snapshot.daily_metrics.is_empty());
    }

    #[test]
    fn snapshot_serializes_with_camel_case_names() {
        let tracker = MetricsTracker::new();
        tracker.record_at(HOUR_MS, 10, true);
        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert!(json.get("totalValidations").is_some());
        assert!(json.get("averageValidationTime").is_some());
        assert!(json["hourlyMetrics"][0].get("successRate").is_some());
        assert!(json["hourlyMetrics"][0].get("averageTime").is_some());
    }
}
