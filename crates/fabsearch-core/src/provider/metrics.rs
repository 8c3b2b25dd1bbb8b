//! Rolling per-provider latency and error metrics
//!
//! A capped window of latency samples plus total/error counters per
//! provider, feeding p50/p95 and error-rate computations. Observability
//! only; metrics never gate dispatch decisions.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;

/// Oldest samples are dropped beyond this window length.
const LATENCY_WINDOW: usize = 300;

#[derive(Debug, Default)]
struct MetricWindow {
    latencies: VecDeque<u64>,
    total: u64,
    errors: u64,
}

/// One provider's metrics at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetricsSnapshot {
    pub id: String,
    pub total: u64,
    pub errors: u64,
    /// errors / total, rounded to three decimals.
    pub error_rate: f64,
    pub p50: u64,
    pub p95: u64,
}

/// Process-wide metrics store, shared across concurrent requests.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<HashMap<String, MetricWindow>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one latency sample and bump the counters.
    pub fn record_latency(&self, provider_id: &str, duration_ms: u64, success: bool) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = inner.entry(provider_id.to_string()).or_default();
        window.total += 1;
        if !success {
            window.errors += 1;
        }
        window.latencies.push_back(duration_ms);
        if window.latencies.len() > LATENCY_WINDOW {
            window.latencies.pop_front();
        }
    }

    /// Snapshot all providers, sorted by id for deterministic output.
    pub fn snapshot(&self) -> Vec<ProviderMetricsSnapshot> {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut snapshots: Vec<ProviderMetricsSnapshot> = inner
            .iter()
            .map(|(id, window)| {
                let mut sorted: Vec<u64> = window.latencies.iter().copied().collect();
                sorted.sort_unstable();
                let error_rate = if window.total > 0 {
                    (window.errors as f64 / window.total as f64 * 1000.0).round() / 1000.0
                } else {
                    0.0
                };
                ProviderMetricsSnapshot {
                    id: id.clone(),
                    total: window.total,
                    errors: window.errors,
                    error_rate,
                    p50: percentile(&sorted, 50.0),
                    p95: percentile(&sorted, 95.0),
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }
}

/// Nearest-rank percentile over an already-sorted window.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let index = ((p / 100.0) * (sorted.len() - 1) as f64).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}
