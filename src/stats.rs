//! Request Statistics
//!
//! Built-in metrics describing the exporter's own traffic with Jeedom. They are
//! rendered ahead of the entity metrics on every scrape and are the way to
//! spot a requester that keeps failing.
//!
//! # Metrics Produced
//!
//! - `jeedom_exporter_requests_total` - RPC calls, labelled by method
//! - `jeedom_exporter_responses_total` - RPC calls, labelled by HTTP status
//!   code (or transport error class)
//! - `jeedom_exporter_transferred_bytes_total` - Response bytes received
//! - `jeedom_exporter_request_throughput_kbps` - min/avg/max throughput
//! - `jeedom_exporter_request_duration_ms` - min/max latency
//! - `jeedom_exporter_response_size_bytes` - min/max response size
//! - `jeedom_exporter_timing_samples` - retained timing samples
//!
//! The aggregate gauges are computed at render time from a bounded ring of
//! samples. Once the ring grows past `limit`, the oldest `remove` samples are
//! dropped in one batch.

use crate::config::TimingsConfig;
use parking_lot::Mutex;
use prometheus::{
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "jeedom_exporter";

/// Timing of one RPC call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSample {
    pub duration: Duration,
    pub bytes: usize,
}

impl TimingSample {
    /// Throughput in KB/s; zero-length calls count as instantaneous
    pub fn throughput_kbps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes as f64 / 1024.0 / secs
    }
}

/// Request statistics for the Jeedom client
#[derive(Clone)]
pub struct RequestStats {
    registry: Arc<Registry>,
    timings: TimingsConfig,
    samples: Arc<Mutex<VecDeque<TimingSample>>>,

    pub requests_total: Arc<IntCounterVec>,
    pub responses_total: Arc<IntCounterVec>,
    pub transferred_bytes: Arc<IntCounter>,
    pub throughput_kbps: Arc<GaugeVec>,
    pub duration_ms: Arc<GaugeVec>,
    pub size_bytes: Arc<GaugeVec>,
    pub timing_samples: Arc<IntGauge>,
}

impl RequestStats {
    pub fn new(timings: TimingsConfig) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Count of RPC requests sent to Jeedom")
                .namespace(NAMESPACE),
            &["method"],
        )?;

        let responses_total = IntCounterVec::new(
            Opts::new(
                "responses_total",
                "Count of RPC responses by HTTP status code or transport error",
            )
            .namespace(NAMESPACE),
            &["code"],
        )?;

        let transferred_bytes = IntCounter::with_opts(
            Opts::new(
                "transferred_bytes_total",
                "Total bytes received from Jeedom",
            )
            .namespace(NAMESPACE),
        )?;

        let throughput_kbps = GaugeVec::new(
            Opts::new(
                "request_throughput_kbps",
                "Request throughput over the retained samples (KB/s)",
            )
            .namespace(NAMESPACE),
            &["stat"],
        )?;

        let duration_ms = GaugeVec::new(
            Opts::new(
                "request_duration_ms",
                "Request latency over the retained samples (ms)",
            )
            .namespace(NAMESPACE),
            &["stat"],
        )?;

        let size_bytes = GaugeVec::new(
            Opts::new(
                "response_size_bytes",
                "Response size over the retained samples (bytes)",
            )
            .namespace(NAMESPACE),
            &["stat"],
        )?;

        let timing_samples = IntGauge::with_opts(
            Opts::new("timing_samples", "Count of retained timing samples").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(responses_total.clone()))?;
        registry.register(Box::new(transferred_bytes.clone()))?;
        registry.register(Box::new(throughput_kbps.clone()))?;
        registry.register(Box::new(duration_ms.clone()))?;
        registry.register(Box::new(size_bytes.clone()))?;
        registry.register(Box::new(timing_samples.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            timings,
            samples: Arc::new(Mutex::new(VecDeque::new())),
            requests_total: Arc::new(requests_total),
            responses_total: Arc::new(responses_total),
            transferred_bytes: Arc::new(transferred_bytes),
            throughput_kbps: Arc::new(throughput_kbps),
            duration_ms: Arc::new(duration_ms),
            size_bytes: Arc::new(size_bytes),
            timing_samples: Arc::new(timing_samples),
        })
    }

    /// Account for one call to `method`
    pub fn record_request(&self, method: &str) {
        self.requests_total.with_label_values(&[method]).inc();
    }

    /// Account for the outcome of one call
    pub fn record_response(&self, code: &str) {
        self.responses_total.with_label_values(&[code]).inc();
    }

    /// Append a timing sample, evicting the oldest batch when over capacity
    pub fn record_timing(&self, sample: TimingSample) {
        self.transferred_bytes.inc_by(sample.bytes as u64);

        let mut samples = self.samples.lock();
        samples.push_back(sample);
        if samples.len() > self.timings.limit {
            let remove = self.timings.remove.clamp(1, samples.len());
            samples.drain(..remove);
        }
    }

    /// Number of calls recorded for `method`
    pub fn requests_count(&self, method: &str) -> u64 {
        self.requests_total.with_label_values(&[method]).get()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    fn refresh_aggregates(&self) {
        let samples = self.samples.lock();
        self.timing_samples.set(samples.len() as i64);

        if samples.is_empty() {
            return;
        }

        let mut min_kbps = f64::MAX;
        let mut max_kbps: f64 = 0.0;
        let mut sum_kbps = 0.0;
        let mut min_ms = f64::MAX;
        let mut max_ms: f64 = 0.0;
        let mut min_size = usize::MAX;
        let mut max_size = 0;

        for sample in samples.iter() {
            let kbps = sample.throughput_kbps();
            min_kbps = min_kbps.min(kbps);
            max_kbps = max_kbps.max(kbps);
            sum_kbps += kbps;

            let ms = sample.duration.as_micros() as f64 / 1000.0;
            min_ms = min_ms.min(ms);
            max_ms = max_ms.max(ms);

            min_size = min_size.min(sample.bytes);
            max_size = max_size.max(sample.bytes);
        }

        self.throughput_kbps.with_label_values(&["min"]).set(min_kbps);
        self.throughput_kbps
            .with_label_values(&["avg"])
            .set(sum_kbps / samples.len() as f64);
        self.throughput_kbps.with_label_values(&["max"]).set(max_kbps);
        self.duration_ms.with_label_values(&["min"]).set(min_ms);
        self.duration_ms.with_label_values(&["max"]).set(max_ms);
        self.size_bytes.with_label_values(&["min"]).set(min_size as f64);
        self.size_bytes.with_label_values(&["max"]).set(max_size as f64);
    }

    /// Render the statistics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        self.refresh_aggregates();

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
