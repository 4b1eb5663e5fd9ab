//! Ledger metrics
//!
//! In-process counters, gauges and latency histograms, exported as JSON or
//! in the Prometheus text format by the `/metrics` endpoint.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Prefix applied to every exported Prometheus metric
const PROMETHEUS_PREFIX: &str = "agrichain";

/// Metrics registry shared by the ledger and the HTTP layer
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    histograms: RwLock<BTreeMap<String, Arc<Histogram>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    pub async fn add_counter(&self, name: &str, value: u64) {
        {
            let counters = self.counters.read().await;
            if let Some(counter) = counters.get(name) {
                counter.fetch_add(value, Ordering::Relaxed);
                return;
            }
        }

        let mut counters = self.counters.write().await;
        counters
            .entry(name.to_string())
            .or_default()
            .fetch_add(value, Ordering::Relaxed);
    }

    pub async fn set_gauge(&self, name: &str, value: u64) {
        {
            let gauges = self.gauges.read().await;
            if let Some(gauge) = gauges.get(name) {
                gauge.store(value, Ordering::Relaxed);
                return;
            }
        }

        let mut gauges = self.gauges.write().await;
        gauges
            .entry(name.to_string())
            .or_default()
            .store(value, Ordering::Relaxed);
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        let counters = self.counters.read().await;
        counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn get_gauge(&self, name: &str) -> u64 {
        let gauges = self.gauges.read().await;
        gauges
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Record a latency observation in seconds
    pub async fn observe_histogram(&self, name: &str, value: f64) {
        {
            let histograms = self.histograms.read().await;
            if let Some(histogram) = histograms.get(name) {
                histogram.observe(value);
                return;
            }
        }

        let mut histograms = self.histograms.write().await;
        histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::default()))
            .observe(value);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn to_json(&self) -> serde_json::Value {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;
        let histograms = self.histograms.read().await;

        let load = |map: &BTreeMap<String, Arc<AtomicU64>>| -> BTreeMap<String, u64> {
            map.iter()
                .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
                .collect()
        };
        let histogram_values: BTreeMap<String, serde_json::Value> = histograms
            .iter()
            .map(|(name, h)| (name.clone(), h.to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": load(&counters),
            "gauges": load(&gauges),
            "histograms": histogram_values,
        })
    }

    /// Export metrics in Prometheus text format
    pub async fn to_prometheus(&self) -> String {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;
        let histograms = self.histograms.read().await;

        let mut output = String::new();
        output.push_str(&format!(
            "# HELP {PROMETHEUS_PREFIX}_uptime_seconds Time since service start\n"
        ));
        output.push_str(&format!("# TYPE {PROMETHEUS_PREFIX}_uptime_seconds gauge\n"));
        output.push_str(&format!(
            "{PROMETHEUS_PREFIX}_uptime_seconds {}\n",
            self.uptime_seconds()
        ));

        for (kind, map) in [("counter", &*counters), ("gauge", &*gauges)] {
            for (name, value) in map.iter() {
                let metric = prometheus_name(name);
                output.push_str(&format!("# TYPE {metric} {kind}\n"));
                output.push_str(&format!("{metric} {}\n", value.load(Ordering::Relaxed)));
            }
        }

        for (name, histogram) in histograms.iter() {
            output.push_str(&histogram.to_prometheus(&prometheus_name(name)));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prometheus_name(name: &str) -> String {
    let name = name.replace(['.', '-'], "_");
    if name.starts_with(PROMETHEUS_PREFIX) {
        name
    } else {
        format!("{PROMETHEUS_PREFIX}_{name}")
    }
}

/// Fixed-bucket histogram
pub struct Histogram {
    /// Upper bounds, ascending
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    /// Sum of observations in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        self.sum_micros
            .fetch_add((value * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|bound| value <= *bound) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
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
            "sum": self.sum_seconds(),
            "count": self.count(),
        })
    }

    fn to_prometheus(&self, metric: &str) -> String {
        let mut output = format!("# TYPE {metric} histogram\n");

        let mut cumulative = 0u64;
        for (bound, count) in self.buckets.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            output.push_str(&format!("{metric}_bucket{{le=\"{bound}\"}} {cumulative}\n"));
        }
        output.push_str(&format!(
            "{metric}_bucket{{le=\"+Inf\"}} {}\n",
            self.count()
        ));
        output.push_str(&format!("{metric}_sum {}\n", self.sum_seconds()));
        output.push_str(&format!("{metric}_count {}\n", self.count()));
        output
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Latency buckets in seconds
        Self::new(vec![
            0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
        ])
    }
}

/// Predefined metric names
pub mod metric_names {
    pub const WRITES_ACCEPTED: &str = "ledger.writes.accepted";
    pub const WRITES_REJECTED: &str = "ledger.writes.rejected";
    pub const WRITES_FAILED: &str = "ledger.writes.failed";

    pub const JOURNAL_APPENDS: &str = "ledger.journal.appends";
    pub const JOURNAL_REPLAYED: &str = "ledger.journal.replayed";

    pub const WRITE_LATENCY: &str = "ledger.write.latency_seconds";
    pub const JOURNAL_APPEND_LATENCY: &str = "ledger.journal.append_latency_seconds";

    pub const HEAD_SEQUENCE: &str = "ledger.head_sequence";
    pub const TOTAL_BATCHES: &str = "ledger.batches.total";
    pub const TOTAL_USERS: &str = "ledger.users.total";
    pub const PAUSED: &str = "ledger.paused";

    /// Counter of accepted events of one type, e.g. `ledger.events.batch.sold`
    pub fn event_counter(event_type: &str) -> String {
        format!("ledger.events.{event_type}")
    }

    /// Counter of rejections of one error kind
    pub fn rejection_counter(kind: &str) -> String {
        format!("ledger.rejections.{kind}")
    }
}

/// Time an async operation into a latency histogram
pub async fn timed<F, T>(metrics: &MetricsRegistry, metric_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f.await;
    metrics
        .observe_histogram(metric_name, start.elapsed().as_secs_f64())
        .await;
    result
}
