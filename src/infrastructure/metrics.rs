//! Provider metrics: atomic counters and a structured snapshot.
//!
//! The provider only accumulates; shipping the snapshot to a telemetry sink
//! is the host's job.

use crate::domain::error::{Error, ErrorClass};
use crate::infrastructure::cache::CacheStats;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic counters shared by every component of one provider instance.
#[derive(Debug, Default)]
pub struct ProviderMetrics {
    load_requests: AtomicU64,
    watch_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    retry_attempts: AtomicU64,
    failed_operations: AtomicU64,
    // Loads that bypassed the cache because head resolution failed; a
    // climbing value can mask a misconfigured reference.
    direct_loads: AtomicU64,
    total_load_time_ns: AtomicU64,
    temp_dirs_created: AtomicU64,
    configs_cached: AtomicU64,
    network_errors: AtomicU64,
    auth_errors: AtomicU64,
    parse_errors: AtomicU64,
    git_errors: AtomicU64,
}

impl ProviderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_load_requests(&self) {
        self.load_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_watch_requests(&self) {
        self.watch_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retry_attempts(&self) {
        self.retry_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_operations(&self) {
        self.failed_operations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_direct_loads(&self) {
        self.direct_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_temp_dirs_created(&self) {
        self.temp_dirs_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_configs_cached(&self) {
        self.configs_cached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_time(&self, elapsed: Duration) {
        self.total_load_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Bucket an error into the per-class counters.
    pub fn record_error(&self, error: &Error) {
        let counter = match error.class() {
            ErrorClass::Network => &self.network_errors,
            ErrorClass::Auth => &self.auth_errors,
            ErrorClass::Parse => &self.parse_errors,
            ErrorClass::Git => &self.git_errors,
            ErrorClass::Other => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read-only snapshot combining the counters with cache statistics.
    pub fn snapshot(&self, config_cache: CacheStats) -> MetricsSnapshot {
        let load_requests = self.load_requests.load(Ordering::Relaxed);
        let watch_requests = self.watch_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);

        let cache_attempts = cache_hits + cache_misses;
        let cache_hit_rate = if cache_attempts > 0 {
            cache_hits as f64 / cache_attempts as f64 * 100.0
        } else {
            0.0
        };

        let total_load_time_ns = self.total_load_time_ns.load(Ordering::Relaxed);
        let avg_load_time_ms = if load_requests > 0 {
            total_load_time_ns as f64 / load_requests as f64 / 1_000_000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            load_requests,
            watch_requests,
            total_requests: load_requests + watch_requests,
            cache_hits,
            cache_misses,
            cache_hit_rate,
            configs_cached: self.configs_cached.load(Ordering::Relaxed),
            retry_attempts: self.retry_attempts.load(Ordering::Relaxed),
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
            direct_loads: self.direct_loads.load(Ordering::Relaxed),
            avg_load_time_ms,
            temp_dirs_created: self.temp_dirs_created.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            auth_errors: self.auth_errors.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            git_errors: self.git_errors.load(Ordering::Relaxed),
            config_cache,
        }
    }
}

/// Read-only provider metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub load_requests: u64,
    pub watch_requests: u64,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hit percentage over all cache consultations (0-100)
    pub cache_hit_rate: f64,
    pub configs_cached: u64,
    pub retry_attempts: u64,
    pub failed_operations: u64,
    /// Loads that bypassed the cache after a head-resolution failure
    pub direct_loads: u64,
    pub avg_load_time_ms: f64,
    pub temp_dirs_created: u64,
    pub network_errors: u64,
    pub auth_errors: u64,
    pub parse_errors: u64,
    pub git_errors: u64,
    pub config_cache: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cache_stats() -> CacheStats {
        CacheStats {
            entries: 0,
            max_size: 100,
            ttl_seconds: 600,
            total_access: 0,
            oldest_entry_age_ms: None,
            newest_entry_age_ms: None,
        }
    }

    #[test]
    fn hit_rate_and_average_load_time() {
        let metrics = ProviderMetrics::new();
        metrics.increment_load_requests();
        metrics.increment_load_requests();
        metrics.increment_cache_hits();
        metrics.increment_cache_misses();
        metrics.record_load_time(Duration::from_millis(10));
        metrics.record_load_time(Duration::from_millis(30));

        let snapshot = metrics.snapshot(empty_cache_stats());
        assert_eq!(snapshot.load_requests, 2);
        assert_eq!(snapshot.total_requests, 2);
        assert!((snapshot.cache_hit_rate - 50.0).abs() < f64::EPSILON);
        assert!((snapshot.avg_load_time_ms - 20.0).abs() < 0.01);
    }

    #[test]
    fn empty_metrics_have_zero_rates() {
        let metrics = ProviderMetrics::new();
        let snapshot = metrics.snapshot(empty_cache_stats());
        assert_eq!(snapshot.cache_hit_rate, 0.0);
        assert_eq!(snapshot.avg_load_time_ms, 0.0);
    }

    #[test]
    fn errors_bucket_by_class() {
        let metrics = ProviderMetrics::new();
        metrics.record_error(&Error::git("connection refused"));
        metrics.record_error(&Error::auth("invalid credentials"));
        metrics.record_error(&Error::parse("yaml", "bad indent"));
        metrics.record_error(&Error::git("checkout failed"));
        metrics.record_error(&Error::resource_limit("too many watches"));

        let snapshot = metrics.snapshot(empty_cache_stats());
        assert_eq!(snapshot.network_errors, 1);
        assert_eq!(snapshot.auth_errors, 1);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.git_errors, 1);
    }
}
