//! Per-source counters for fetches, renders and cache lookups
//!
//! Tracks success rates and error categories so the API layer can show which
//! origin sites are currently misbehaving.

use crate::error::FetchFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceMetrics {
    pub source_name: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_response_time_ms: f64,
    pub total_response_time_ms: u64,
    pub retry_count: u64,
    pub rate_limit_hits: u64,
    pub timeout_count: u64,
    pub render_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl SourceMetrics {
    pub fn new(source_name: String) -> Self {
        Self {
            source_name,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
            average_response_time_ms: 0.0,
            total_response_time_ms: 0,
            retry_count: 0,
            rate_limit_hits: 0,
            timeout_count: 0,
            render_failures: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.successful_requests as f64 / self.total_requests as f64) * 100.0
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / lookups as f64) * 100.0
        }
    }

    pub fn record_success(&mut self, response_time: Duration) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.last_success = Some(Utc::now());

        let response_ms = response_time.as_millis() as u64;
        self.total_response_time_ms += response_ms;
        self.average_response_time_ms =
            self.total_response_time_ms as f64 / self.successful_requests as f64;
    }

    /// Counts a request that failed after its last retry. Rate limiting is
    /// counted per response by [`MetricsTracker::record_rate_limit`].
    pub fn record_failure(&mut self, failure: &FetchFailure) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_failure = Some(Utc::now());
        if failure.is_timeout() {
            self.timeout_count += 1;
        }
        self.last_error = Some(failure.to_string());
    }
}

/// Shared, cheaply cloneable tracker.
#[derive(Clone, Default)]
pub struct MetricsTracker {
    metrics: Arc<Mutex<HashMap<String, SourceMetrics>>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SourceMetrics>> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_source<F: FnOnce(&mut SourceMetrics)>(&self, source_name: &str, f: F) {
        let mut metrics = self.lock();
        let entry = metrics
            .entry(source_name.to_string())
            .or_insert_with(|| SourceMetrics::new(source_name.to_string()));
        f(entry);
    }

    pub fn record_success(&self, source_name: &str, response_time: Duration) {
        self.with_source(source_name, |m| {
            m.record_success(response_time);
            log::debug!(
                "[{}] Fetch ok in {}ms - success rate {:.2}%",
                source_name,
                response_time.as_millis(),
                m.success_rate()
            );
        });
    }

    pub fn record_failure(&self, source_name: &str, failure: &FetchFailure) {
        self.with_source(source_name, |m| {
            m.record_failure(failure);
            log::warn!(
                "[{}] Fetch failed: {} - success rate {:.2}%",
                source_name,
                failure,
                m.success_rate()
            );
        });
    }

    /// One 429 response, whether or not it was retried
    pub fn record_rate_limit(&self, source_name: &str) {
        self.with_source(source_name, |m| m.rate_limit_hits += 1);
    }

    pub fn record_retry(&self, source_name: &str) {
        self.with_source(source_name, |m| m.retry_count += 1);
    }

    pub fn record_render_failure(&self, source_name: &str) {
        self.with_source(source_name, |m| m.render_failures += 1);
    }

    pub fn record_cache(&self, source_name: &str, hit: bool) {
        self.with_source(source_name, |m| {
            if hit {
                m.cache_hits += 1;
            } else {
                m.cache_misses += 1;
            }
        });
    }

    pub fn get_metrics(&self, source_name: &str) -> Option<SourceMetrics> {
        self.lock().get(source_name).cloned()
    }

    pub fn get_all_metrics(&self) -> Vec<SourceMetrics> {
        let mut all: Vec<SourceMetrics> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        all
    }

    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&*self.lock()).unwrap_or_else(|_| "{}".to_string())
    }
}
