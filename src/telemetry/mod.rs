//! Engine telemetry and tracing bootstrap.

use parking_lot::RwLock;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops. `RUST_LOG` overrides the default filter.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[derive(Debug, Default, Clone, Copy)]
struct MetricsInner {
    screening_count: u64,
    avg_latency_ms: f64,
}

/// Screening throughput and latency counters.
///
/// Latency is an exponentially weighted moving average
/// (new = 0.9 * old + 0.1 * current). The lock here is a leaf: it never
/// nests with the screening context mutex or the matcher index locks.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    inner: RwLock<MetricsInner>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed screening
    pub fn record_screening(&self, duration_ms: u64) {
        let mut inner = self.inner.write();
        inner.screening_count += 1;
        inner.avg_latency_ms = inner.avg_latency_ms * 0.9 + duration_ms as f64 * 0.1;
    }

    pub fn screening_count(&self) -> u64 {
        self.inner.read().screening_count
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.inner.read().avg_latency_ms
    }
}
