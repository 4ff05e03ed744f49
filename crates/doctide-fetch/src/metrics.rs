//! Per-host request metrics, ported from the teacher's
//! `riptide-fetch::fetch::{HostMetrics, FetchMetricsResponse}`. This is
//! ambient observability surfaced as a one-line summary log at the end of a
//! run, not a full metrics/exporter stack — that remains out of scope.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Request/success/failure counters for a single host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostMetrics {
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_duration_ms: u64,
}

impl HostMetrics {
    pub fn avg_duration_ms(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.request_count as f64
        }
    }
}

/// Shared, clonable per-host metrics table.
#[derive(Clone, Default)]
pub struct FetchMetrics {
    hosts: Arc<DashMap<String, HostMetrics>>,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn host_of(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn record(&self, url: &str, success: bool, duration_ms: u64) {
        let host = Self::host_of(url);
        let mut entry = self.hosts.entry(host).or_default();
        entry.request_count += 1;
        entry.total_duration_ms += duration_ms;
        if success {
            entry.success_count += 1;
        } else {
            entry.failure_count += 1;
        }
    }

    pub fn snapshot(&self) -> Vec<(String, HostMetrics)> {
        self.hosts
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// One-line summary suitable for a closing `tracing::info!` call.
    pub fn summary_line(&self) -> String {
        let snapshot = self.snapshot();
        let total_requests: u64 = snapshot.iter().map(|(_, m)| m.request_count).sum();
        let total_failures: u64 = snapshot.iter().map(|(_, m)| m.failure_count).sum();
        format!(
            "{} request(s) across {} host(s), {} failure(s)",
            total_requests,
            snapshot.len(),
            total_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_per_host_counters() {
        let metrics = FetchMetrics::new();
        metrics.record("https://docs.example.com/a", true, 100);
        metrics.record("https://docs.example.com/b", false, 200);
        metrics.record("https://other.example/x", true, 50);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.len(), 2);
        let docs = snapshot
            .iter()
            .find(|(h, _)| h == "docs.example.com")
            .unwrap();
        assert_eq!(docs.1.request_count, 2);
        assert_eq!(docs.1.failure_count, 1);
        assert_eq!(docs.1.avg_duration_ms(), 150.0);
    }

    #[test]
    fn summary_line_counts_totals() {
        let metrics = FetchMetrics::new();
        metrics.record("https://x/a", true, 10);
        metrics.record("https://x/b", false, 10);
        assert_eq!(metrics.summary_line(), "2 request(s) across 1 host(s), 1 failure(s)");
    }
}
