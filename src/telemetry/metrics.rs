// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metrics collection for the correlation engine.
//!
//! Lightweight in-process counters and timings: backend call outcomes, retry
//! attempts, cache rebuilds and generic operation latencies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Backend call outcomes by operation name.
    backend: RwLock<HashMap<String, BackendCallMetrics>>,

    /// General operation metrics.
    operations: RwLock<HashMap<String, OperationMetrics>>,

    /// Number of retry attempts taken across all call sites.
    retries: AtomicU64,

    /// Number of completed environment switches.
    environment_switches: AtomicU64,

    /// Start time for calculating uptime.
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            backend: RwLock::new(HashMap::new()),
            operations: RwLock::new(HashMap::new()),
            retries: AtomicU64::new(0),
            environment_switches: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record the final outcome of a backend call (after retries).
    pub fn record_backend_call(&self, name: &str, duration: Duration, success: bool) {
        if let Ok(mut backend) = self.backend.write() {
            backend
                .entry(name.to_string())
                .or_insert_with(BackendCallMetrics::new)
                .record(duration, success);
        }
    }

    /// Record a generic operation.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        if let Ok(mut ops) = self.operations.write() {
            ops.entry(name.to_string())
                .or_insert_with(OperationMetrics::new)
                .record(duration);
        }
    }

    /// Record one retry attempt.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed environment switch.
    pub fn record_environment_switch(&self) {
        self.environment_switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get metrics for a backend operation.
    pub fn backend_metrics(&self, name: &str) -> Option<BackendCallMetrics> {
        self.backend.read().ok()?.get(name).cloned()
    }

    /// Get metrics for a specific operation.
    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations.read().ok()?.get(name).cloned()
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn environment_switches(&self) -> u64 {
        self.environment_switches.load(Ordering::Relaxed)
    }

    /// Get uptime since metrics were initialized.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            backend: self
                .backend
                .read()
                .map(|m| m.clone())
                .unwrap_or_default(),
            operations: self
                .operations
                .read()
                .map(|m| m.clone())
                .unwrap_or_default(),
            retries: self.retries(),
            environment_switches: self.environment_switches(),
            uptime: self.uptime(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        if let Ok(mut backend) = self.backend.write() {
            backend.clear();
        }
        if let Ok(mut ops) = self.operations.write() {
            ops.clear();
        }
        self.retries.store(0, Ordering::Relaxed);
        self.environment_switches.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcomes of one backend operation.
#[derive(Debug, Clone)]
pub struct BackendCallMetrics {
    pub calls: u64,
    pub failures: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl BackendCallMetrics {
    pub fn new() -> Self {
        Self {
            calls: 0,
            failures: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, duration: Duration, success: bool) {
        self.calls += 1;
        if !success {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }

    /// Fraction of calls that failed (0.0 to 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }
}

impl Default for BackendCallMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic operation metrics with histogram.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bucket bounds in microseconds; one extra overflow bucket.
    bounds: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_bounds(bounds: Vec<u64>) -> Self {
        let counts = vec![0; bounds.len() + 1];
        Self { bounds, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        let idx = self
            .bounds
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(self.bounds.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Upper bound of the bucket holding the given percentile.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }
        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut seen = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            seen += count;
            if seen >= target {
                let micros = self
                    .bounds
                    .get(i)
                    .copied()
                    .unwrap_or_else(|| self.bounds.last().copied().unwrap_or(0) * 10);
                return Duration::from_micros(micros);
            }
        }
        Duration::ZERO
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 100us, 1ms, 10ms, 100ms, 1s, 10s
        Self::with_bounds(vec![100, 1_000, 10_000, 100_000, 1_000_000, 10_000_000])
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub backend: HashMap<String, BackendCallMetrics>,
    pub operations: HashMap<String, OperationMetrics>,
    pub retries: u64,
    pub environment_switches: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Metrics Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Retries: {}, environment switches: {}\n\n",
            self.retries, self.environment_switches
        ));

        if !self.backend.is_empty() {
            report.push_str("Backend Calls:\n");
            let mut names: Vec<_> = self.backend.keys().collect();
            names.sort();
            for name in names {
                let m = &self.backend[name];
                report.push_str(&format!(
                    "  {}: {} calls, {:.1}% failed, max {:.2?}\n",
                    name,
                    m.calls,
                    m.failure_rate() * 100.0,
                    m.max_duration
                ));
            }
            report.push('\n');
        }

        if !self.operations.is_empty() {
            report.push_str("Operation Metrics:\n");
            let mut names: Vec<_> = self.operations.keys().collect();
            names.sort();
            for name in names {
                let m = &self.operations[name];
                report.push_str(&format!(
                    "  {}: {} ops, avg {:.2?}, p99 {:.2?}\n",
                    name,
                    m.count,
                    m.avg_duration(),
                    m.histogram.percentile(99.0)
                ));
            }
        }

        report
    }
}
