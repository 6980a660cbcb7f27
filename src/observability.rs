use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{info, warn};

/// Adapter API usage metrics
#[derive(Debug, Default)]
pub struct AdapterApiMetrics {
    pub total_requests: AtomicU64,
    pub errors: AtomicU64,
    pub timeouts: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl AdapterApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        warn!("Adapter call deadline exceeded");
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> AdapterApiStats {
        AdapterApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Adapter API metrics: requests={}, errors={}, timeouts={}, cache_hits={}, cache_misses={}",
            stats.total_requests, stats.errors, stats.timeouts, stats.cache_hits, stats.cache_misses
        );
    }
}

#[derive(Debug, Clone)]
pub struct AdapterApiStats {
    pub total_requests: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Global metrics instance
static ADAPTER_METRICS: std::sync::LazyLock<AdapterApiMetrics> =
    std::sync::LazyLock::new(AdapterApiMetrics::new);

pub fn adapter_metrics() -> &'static AdapterApiMetrics {
    &ADAPTER_METRICS
}

/// Create correlated spans for report domain fetches
pub fn create_domain_span(domain: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "domain_fetch",
        domain.name = domain,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

/// Time an operation and record metrics
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[macro_export]
macro_rules! time_operation {
    ($operation:expr) => {
        let _timer = $crate::observability::OperationTimer::new($operation);
    };
}
