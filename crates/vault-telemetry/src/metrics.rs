use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;

/// Monotonic counter, e.g. `ingestions_total`.
#[derive(Default)]
pub struct Counter {
    value: AtomicU64,
    help: &'static str,
}

impl Counter {
    pub fn new(help: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            help,
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Signed point-in-time value, e.g. `watcher_channel_backlog`.
#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
    help: &'static str,
}

impl Gauge {
    pub fn new(help: &'static str) -> Self {
        Self {
            value: AtomicI64::new(0),
            help,
        }
    }

    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
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

struct HistogramState {
    bucket_counts: Vec<u64>,
    sum: f64,
    count: u64,
}

/// Fixed-bucket histogram exposed in Prometheus's cumulative `le` convention.
pub struct Histogram {
    bounds: Vec<f64>,
    state: Mutex<HistogramState>,
    help: &'static str,
}

impl Histogram {
    pub fn new(help: &'static str, bounds: Vec<f64>) -> Self {
        let bucket_counts = vec![0u64; bounds.len() + 1]; // +1 for the +Inf bucket
        Self {
            bounds,
            state: Mutex::new(HistogramState {
                bucket_counts,
                sum: 0.0,
                count: 0,
            }),
            help,
        }
    }

    /// Default latency buckets in seconds, used for coarse end-to-end timings.
    pub fn default_seconds_buckets() -> Vec<f64> {
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    }

    /// Default latency buckets in milliseconds, used for object-store call timings.
    pub fn default_millis_buckets() -> Vec<f64> {
        vec![
            10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ]
    }

    pub fn observe(&self, value: f64) {
        let mut state = self.state.lock();
        state.sum += value;
        state.count += 1;
        for (i, bound) in self.bounds.iter().enumerate() {
            if value <= *bound {
                state.bucket_counts[i] += 1;
            }
        }
        // +Inf bucket always observes.
        let last = state.bucket_counts.len() - 1;
        state.bucket_counts[last] += 1;
    }

    fn snapshot(&self) -> (Vec<(f64, u64)>, f64, u64) {
        let state = self.state.lock();
        let mut buckets: Vec<(f64, u64)> = self
            .bounds
            .iter()
            .zip(state.bucket_counts.iter())
            .map(|(b, c)| (*b, *c))
            .collect();
        buckets.push((f64::INFINITY, state.bucket_counts[state.bucket_counts.len() - 1]));
        (buckets, state.sum, state.count)
    }
}

/// Process-wide metrics registry. Constructed once at boot and shared as an `Arc`
/// with every component; never accessed through a global/static.
pub struct MetricsRegistry {
    pub ingestions_total: Counter,
    pub ingestion_failures_total: Counter,
    pub deletions_total: Counter,
    pub deletion_failures_total: Counter,
    pub auth_failures_total: Counter,
    pub auth_rate_limited_total: Counter,
    pub circuit_breaker_rejections_total: Counter,
    pub circuit_breaker_opens_total: Counter,
    pub watcher_restarts_total: Counter,
    pub consistency_checks_total: Counter,
    pub consistency_errors_found_total: Counter,
    pub http_requests_total: Counter,

    pub watcher_channel_backlog: Gauge,
    pub pending_files: Gauge,
    pub missing_objects: Gauge,
    pub in_flight_paths: Gauge,

    pub ingestion_duration_seconds: Histogram,
    pub object_store_latency_ms: Histogram,
    pub http_request_duration_seconds: Histogram,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self {
            ingestions_total: Counter::new("total successful ingestions"),
            ingestion_failures_total: Counter::new("total failed ingestions"),
            deletions_total: Counter::new("total successful deletions"),
            deletion_failures_total: Counter::new("total failed deletions"),
            auth_failures_total: Counter::new("total failed collection key verifications"),
            auth_rate_limited_total: Counter::new("total requests rejected by the auth limiter"),
            circuit_breaker_rejections_total: Counter::new(
                "total object store calls rejected by the open circuit breaker",
            ),
            circuit_breaker_opens_total: Counter::new("total circuit breaker trips"),
            watcher_restarts_total: Counter::new("total watcher thread restarts by the supervisor"),
            consistency_checks_total: Counter::new("total consistency sweep runs"),
            consistency_errors_found_total: Counter::new(
                "total objects found missing from the store during a consistency sweep",
            ),
            http_requests_total: Counter::new("total HTTP requests served"),

            watcher_channel_backlog: Gauge::new("current depth of the watcher event channel"),
            pending_files: Gauge::new("files observed on disk but not yet reflected in the catalog"),
            missing_objects: Gauge::new("READY catalog rows with no matching blob in the store"),
            in_flight_paths: Gauge::new("paths currently being ingested or deleted"),

            ingestion_duration_seconds: Histogram::new(
                "end-to-end ingestion pipeline duration",
                Histogram::default_seconds_buckets(),
            ),
            object_store_latency_ms: Histogram::new(
                "object store call latency",
                Histogram::default_millis_buckets(),
            ),
            http_request_duration_seconds: Histogram::new(
                "HTTP request duration",
                Histogram::default_seconds_buckets(),
            ),
        }
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> Vec<(&'static str, &Counter)> {
        vec![
            ("vault_ingestions_total", &self.ingestions_total),
            ("vault_ingestion_failures_total", &self.ingestion_failures_total),
            ("vault_deletions_total", &self.deletions_total),
            ("vault_deletion_failures_total", &self.deletion_failures_total),
            ("vault_auth_failures_total", &self.auth_failures_total),
            ("vault_auth_rate_limited_total", &self.auth_rate_limited_total),
            (
                "vault_circuit_breaker_rejections_total",
                &self.circuit_breaker_rejections_total,
            ),
            ("vault_circuit_breaker_opens_total", &self.circuit_breaker_opens_total),
            ("vault_watcher_restarts_total", &self.watcher_restarts_total),
            ("vault_consistency_checks_total", &self.consistency_checks_total),
            (
                "vault_consistency_errors_found_total",
                &self.consistency_errors_found_total,
            ),
            ("vault_http_requests_total", &self.http_requests_total),
        ]
    }

    fn gauges(&self) -> Vec<(&'static str, &Gauge)> {
        vec![
            ("vault_watcher_channel_backlog", &self.watcher_channel_backlog),
            ("vault_pending_files", &self.pending_files),
            ("vault_missing_objects", &self.missing_objects),
            ("vault_in_flight_paths", &self.in_flight_paths),
        ]
    }

    fn histograms(&self) -> Vec<(&'static str, &Histogram)> {
        vec![
            ("vault_ingestion_duration_seconds", &self.ingestion_duration_seconds),
            ("vault_object_store_latency_ms", &self.object_store_latency_ms),
            (
                "vault_http_request_duration_seconds",
                &self.http_request_duration_seconds,
            ),
        ]
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        for (name, counter) in self.counters() {
            out.push_str(&format!("# HELP {name} {}\n", counter.help));
            out.push_str(&format!("# TYPE {name} counter\n"));
            out.push_str(&format!("{name} {}\n", counter.get()));
        }
        for (name, gauge) in self.gauges() {
            out.push_str(&format!("# HELP {name} {}\n", gauge.help));
            out.push_str(&format!("# TYPE {name} gauge\n"));
            out.push_str(&format!("{name} {}\n", gauge.get()));
        }
        for (name, hist) in self.histograms() {
            out.push_str(&format!("# HELP {name} {}\n", hist.help));
            out.push_str(&format!("# TYPE {name} histogram\n"));
            let (buckets, sum, count) = hist.snapshot();
            for (bound, cumulative) in buckets {
                let le = if bound.is_infinite() {
                    "+Inf".to_string()
                } else {
                    bound.to_string()
                };
                out.push_str(&format!("{name}_bucket{{le=\"{le}\"}} {cumulative}\n"));
            }
            out.push_str(&format!("{name}_sum {sum}\n"));
            out.push_str(&format!("{name}_count {count}\n"));
        }
        out
    }

    /// Render the registry as a flat JSON map (counters/gauges as scalars, histograms summarized).
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = BTreeMap::new();
        for (name, counter) in self.counters() {
            map.insert(name.to_string(), serde_json::json!(counter.get()));
        }
        for (name, gauge) in self.gauges() {
            map.insert(name.to_string(), serde_json::json!(gauge.get()));
        }
        for (name, hist) in self.histograms() {
            let (_, sum, count) = hist.snapshot();
            map.insert(
                format!("{name}_sum"),
                serde_json::json!(sum),
            );
            map.insert(format!("{name}_count"), serde_json::json!(count));
        }
        serde_json::json!(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let c = Counter::new("test");
        c.inc();
        c.inc_by(4);
        assert_eq!(c.get(), 5);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = Histogram::new("test", vec![1.0, 5.0]);
        h.observe(0.5);
        h.observe(3.0);
        h.observe(100.0);
        let (buckets, sum, count) = h.snapshot();
        assert_eq!(count, 3);
        assert_eq!(sum, 103.5);
        assert_eq!(buckets[0], (1.0, 1));
        assert_eq!(buckets[1], (5.0, 2));
        assert_eq!(buckets[2].1, 3); // +Inf
    }

    #[test]
    fn registry_renders_prometheus_text() {
        let registry = MetricsRegistry::new();
        registry.ingestions_total.inc();
        let text = registry.to_prometheus();
        assert!(text.contains("# HELP vault_ingestions_total"));
        assert!(text.contains("vault_ingestions_total 1"));
    }
}
