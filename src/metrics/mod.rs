//! Metrics for the proof gateway
//!
//! Counters and latency histograms kept in process and exposed as JSON on
//! `GET /metrics`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Shared metrics registry
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,

    histograms: RwLock<HashMap<String, Arc<Histogram>>>,

    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter
    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    /// Add to a counter
    pub async fn add_counter(&self, name: &str, value: u64) {
        let counters = self.counters.read().await;
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        drop(counters);

        let mut counters = self.counters.write().await;
        let counter = counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)));
        counter.fetch_add(value, Ordering::Relaxed);
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        let counters = self.counters.read().await;
        counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Record a histogram observation in milliseconds
    pub async fn observe_ms(&self, name: &str, value: f64) {
        let histograms = self.histograms.read().await;
        if let Some(histogram) = histograms.get(name) {
            histogram.observe(value);
            return;
        }
        drop(histograms);

        let mut histograms = self.histograms.write().await;
        let histogram = histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::default()));
        histogram.observe(value);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// All metrics as JSON
    pub async fn to_json(&self) -> serde_json::Value {
        let counters = self.counters.read().await;
        let histograms = self.histograms.read().await;

        let counter_values: HashMap<&str, u64> = counters
            .iter()
            .map(|(k, v)| (k.as_str(), v.load(Ordering::Relaxed)))
            .collect();

        let histogram_values: HashMap<&str, serde_json::Value> = histograms
            .iter()
            .map(|(k, h)| (k.as_str(), h.to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": counter_values,
            "histograms": histogram_values,
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-bucket histogram
pub struct Histogram {
    /// Upper bounds, ascending
    buckets: Vec<f64>,

    counts: Vec<AtomicU64>,

    /// Sum in thousandths of the observed unit
    sum: AtomicU64,

    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        self.sum
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|bound| value <= *bound) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let bucket_counts: Vec<u64> = self
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();

        serde_json::json!({
            "buckets": self.buckets,
            "counts": bucket_counts,
            "sum": self.sum.load(Ordering::Relaxed) as f64 / 1000.0,
            "count": self.count(),
        })
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Request latency in milliseconds
        Self::new(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
    }
}

/// Predefined metric names
pub mod metric_names {
    // Requests
    pub const PROOFS_REQUESTS: &str = "proofs_requests_total";
    pub const PROOFS_REQUESTED_IDS: &str = "proofs_requested_ids_total";
    pub const PROOFS_UNRESOLVED: &str = "proofs_unresolved_total";

    // Shard fan-out
    pub const SHARD_BATCHES: &str = "shard_batches_total";
    pub const SHARD_BATCH_FAILURES: &str = "shard_batch_failures_total";

    pub const METADATA_FETCH_FAILURES: &str = "metadata_fetch_failures_total";

    pub const PROOFS_REQUEST_DURATION: &str = "proofs_request_duration_ms";
}
