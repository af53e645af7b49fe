//! Upstream call metrics
//!
//! Tracks latency percentiles and success rates per upstream endpoint.
//! Nothing here feeds back into query results.

use crate::constants::METRICS_WINDOW;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

/// Upstream endpoint a call was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamEndpoint {
    Listings,
    Quotes,
}

impl UpstreamEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamEndpoint::Listings => "listings",
            UpstreamEndpoint::Quotes => "quotes",
        }
    }
}

/// Metrics for a single upstream endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EndpointMetrics {
    pub endpoint: &'static str,
    /// 50th percentile latency of successful calls, in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful calls, in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
}

#[derive(Debug, Default)]
struct EndpointStats {
    samples: VecDeque<(f64, bool)>,
    total: u64,
    failed: u64,
}

/// Collects per-endpoint call metrics
#[derive(Debug, Default)]
pub struct UpstreamMetrics {
    stats: RwLock<HashMap<UpstreamEndpoint, EndpointStats>>,
}

impl UpstreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call with its duration and outcome
    pub async fn record(&self, endpoint: UpstreamEndpoint, duration: Duration, success: bool) {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(endpoint).or_default();

        entry.total += 1;
        if !success {
            entry.failed += 1;
        }
        if entry.samples.len() >= METRICS_WINDOW {
            entry.samples.pop_front();
        }
        entry
            .samples
            .push_back((duration.as_secs_f64() * 1000.0, success));
    }

    /// Current metrics for every endpoint that has been called, listings first
    pub async fn snapshot(&self) -> Vec<EndpointMetrics> {
        let stats = self.stats.read().await;

        [UpstreamEndpoint::Listings, UpstreamEndpoint::Quotes]
            .into_iter()
            .filter_map(|endpoint| stats.get(&endpoint).map(|s| (endpoint, s)))
            .map(|(endpoint, s)| {
                let mut latencies: Vec<f64> = s
                    .samples
                    .iter()
                    .filter(|(_, ok)| *ok)
                    .map(|(ms, _)| *ms)
                    .collect();
                latencies.sort_by(|a, b| a.total_cmp(b));

                EndpointMetrics {
                    endpoint: endpoint.as_str(),
                    latency_p50_ms: percentile(&latencies, 50.0),
                    latency_p99_ms: percentile(&latencies, 99.0),
                    success_rate: if s.total > 0 {
                        (s.total - s.failed) as f64 / s.total as f64
                    } else {
                        1.0
                    },
                    total_requests: s.total,
                    failed_requests: s.failed,
                }
            })
            .collect()
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
