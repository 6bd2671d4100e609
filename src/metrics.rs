//! Metrics Collection
//!
//! Lock-free counters, gauges and histograms, grouped into labeled families
//! and exported in the Prometheus text exposition format. One
//! [`AppMetrics`] instance is created at startup and shared by reference;
//! there is no global registry.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Atomic counter for thread-safe incrementing
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the counter by a value
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Atomic gauge that can go up and down
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Histogram over durations
///
/// Buckets are upper bounds in microseconds; counts are stored per bucket and
/// made cumulative on export.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<u64>,
    counts: Vec<AtomicU64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Latency buckets from 5ms to 10s
    pub fn new_latency() -> Self {
        let buckets: Vec<u64> = vec![
            5_000, 10_000, 25_000, 50_000, 75_000, 100_000, 250_000, 500_000, 750_000,
            1_000_000, 2_500_000, 5_000_000, 7_500_000, 10_000_000,
        ];
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();

        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a duration
    pub fn observe(&self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|&bound| micros <= bound) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// (upper bound in seconds, cumulative count) per finite bucket
    pub fn cumulative_buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0;
        self.buckets
            .iter()
            .zip(&self.counts)
            .map(|(&bound, count)| {
                cumulative += count.load(Ordering::Relaxed);
                (bound as f64 / 1_000_000.0, cumulative)
            })
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new_latency()
    }
}

/// A metric family keyed by label values
#[derive(Debug)]
pub struct Family<M> {
    label_names: &'static [&'static str],
    members: RwLock<BTreeMap<Vec<String>, Arc<M>>>,
}

impl<M: Default> Family<M> {
    pub fn new(label_names: &'static [&'static str]) -> Self {
        Self {
            label_names,
            members: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get (or create) the member for these label values
    ///
    /// Values are matched positionally against the family's label names.
    pub fn with_labels(&self, values: &[&str]) -> Arc<M> {
        debug_assert_eq!(values.len(), self.label_names.len());
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(member) = self.members.read().get(&key) {
            return member.clone();
        }
        self.members.write().entry(key).or_default().clone()
    }

    /// Get the member for these label values if it was ever touched
    pub fn get(&self, values: &[&str]) -> Option<Arc<M>> {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.members.read().get(&key).cloned()
    }

    fn snapshot(&self) -> Vec<(String, Arc<M>)> {
        self.members
            .read()
            .iter()
            .map(|(values, member)| (format_labels(self.label_names, values), member.clone()))
            .collect()
    }
}

/// All application metrics
#[derive(Debug)]
pub struct AppMetrics {
    // HTTP API
    pub http_requests_total: Family<Counter>,
    pub http_request_latency: Family<Histogram>,
    pub http_exceptions_total: Family<Counter>,
    pub http_requests_in_progress: Family<Gauge>,
    pub search_queries_total: Family<Counter>,

    // Backend calls
    pub backend_requests_total: Family<Counter>,
    pub backend_request_duration: Family<Histogram>,
    pub backend_exceptions_total: Family<Counter>,
    pub documents_indexed_total: Family<Counter>,

    // Resources
    pub memory_usage_bytes: Gauge,
}

const HTTP_LABELS: &[&str] = &["method", "endpoint"];
const HTTP_EXCEPTION_LABELS: &[&str] = &["method", "endpoint", "exception_type"];
const BACKEND_LABELS: &[&str] = &["backend", "operation", "index_name"];
const BACKEND_EXCEPTION_LABELS: &[&str] = &["backend", "operation", "index_name", "exception_type"];

impl Default for AppMetrics {
    fn default() -> Self {
        Self {
            http_requests_total: Family::new(HTTP_LABELS),
            http_request_latency: Family::new(HTTP_LABELS),
            http_exceptions_total: Family::new(HTTP_EXCEPTION_LABELS),
            http_requests_in_progress: Family::new(HTTP_LABELS),
            search_queries_total: Family::new(&["index_name"]),
            backend_requests_total: Family::new(BACKEND_LABELS),
            backend_request_duration: Family::new(BACKEND_LABELS),
            backend_exceptions_total: Family::new(BACKEND_EXCEPTION_LABELS),
            documents_indexed_total: Family::new(&["backend", "index_name"]),
            memory_usage_bytes: Gauge::new(),
        }
    }
}

impl AppMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shareable metrics instance
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Update memory usage from the system
    pub fn update_memory_usage(&self) {
        if let Some(usage) = get_memory_usage() {
            self.memory_usage_bytes.set(usage as i64);
        }
    }

    /// Export all metrics in Prometheus exposition format
    pub fn to_prometheus(&self) -> String {
        let mut out = String::with_capacity(4096);

        write_counters(&mut out, "http_request_total", "Requests", &self.http_requests_total);
        write_histograms(&mut out, "http_request_latency_seconds", "Request latency in seconds", &self.http_request_latency);
        write_counters(&mut out, "http_exception_total", "Exceptions raised", &self.http_exceptions_total);
        write_gauges(&mut out, "http_request_in_progress_count", "Requests in flight", &self.http_requests_in_progress);
        write_counters(&mut out, "aum_search_query_total", "Search queries", &self.search_queries_total);

        write_counters(&mut out, "aum_backend_requests_total", "Total backend requests", &self.backend_requests_total);
        write_histograms(&mut out, "aum_backend_request_duration_seconds", "Backend request duration in seconds", &self.backend_request_duration);
        write_counters(&mut out, "aum_backend_exceptions_total", "Total backend request failures", &self.backend_exceptions_total);
        write_counters(&mut out, "aum_documents_indexed_total", "Total number of documents indexed", &self.documents_indexed_total);

        write_header(&mut out, "aum_memory_usage_bytes", "Current memory usage in bytes", "gauge");
        let _ = writeln!(out, "aum_memory_usage_bytes {}", self.memory_usage_bytes.get());
        let _ = writeln!(out);

        out
    }
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn write_counters(out: &mut String, name: &str, help: &str, family: &Family<Counter>) {
    write_header(out, name, help, "counter");
    for (labels, counter) in family.snapshot() {
        let _ = writeln!(out, "{}{{{}}} {}", name, labels, counter.get());
    }
    let _ = writeln!(out);
}

fn write_gauges(out: &mut String, name: &str, help: &str, family: &Family<Gauge>) {
    write_header(out, name, help, "gauge");
    for (labels, gauge) in family.snapshot() {
        let _ = writeln!(out, "{}{{{}}} {}", name, labels, gauge.get());
    }
    let _ = writeln!(out);
}

fn write_histograms(out: &mut String, name: &str, help: &str, family: &Family<Histogram>) {
    write_header(out, name, help, "histogram");
    for (labels, hist) in family.snapshot() {
        for (le, cumulative) in hist.cumulative_buckets() {
            let _ = writeln!(out, "{}_bucket{{{},le=\"{:.3}\"}} {}", name, labels, le, cumulative);
        }
        let _ = writeln!(out, "{}_bucket{{{},le=\"+Inf\"}} {}", name, labels, hist.count());
        let _ = writeln!(out, "{}_sum{{{}}} {:.6}", name, labels, hist.sum_seconds());
        let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, hist.count());
    }
    let _ = writeln!(out);
}

/// Render `name="value",...` with Prometheus label escaping
fn format_labels(names: &[&str], values: &[String]) -> String {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| {
            let escaped = value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n");
            format!("{}=\"{}\"", name, escaped)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record to histogram and return elapsed
    pub fn record(self, histogram: &Histogram) -> Duration {
        let elapsed = self.elapsed();
        histogram.observe(elapsed);
        elapsed
    }
}

/// Holds a gauge incremented while alive
///
/// Decrements on drop, so a request future cancelled mid-flight still
/// releases its slot.
pub struct InProgressGuard {
    gauge: Arc<Gauge>,
}

impl InProgressGuard {
    pub fn new(gauge: Arc<Gauge>) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Get current process memory usage in bytes
fn get_memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(rss) = content.split_whitespace().nth(1) {
                if let Ok(pages) = rss.parse::<u64>() {
                    // Page size is typically 4KB
                    return Some(pages * 4096);
                }
            }
        }
    }

    None
}
