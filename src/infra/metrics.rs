//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations; reporting swaps the interval
//! counters to zero so each summary line covers one reporting window.
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    // Cumulative counters
    cycles: AtomicU64,
    captures_ok: AtomicU64,
    captures_failed: AtomicU64,
    detector_runs: AtomicU64,
    detector_failures: AtomicU64,
    detections_seen: AtomicU64,
    alert_bursts: AtomicU64,
    sms_sent: AtomicU64,
    sms_failed: AtomicU64,
    purges: AtomicU64,
    purge_failures: AtomicU64,
    // Per-interval, swapped to zero on report
    interval_cycles: AtomicU64,
    cycle_latency_max_ms: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, latency_ms: u64) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.interval_cycles.fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.cycle_latency_max_ms, latency_ms);
    }

    pub fn record_capture_ok(&self) {
        self.captures_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_failed(&self) {
        self.captures_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detector_run(&self, detections: u64) {
        self.detector_runs.fetch_add(1, Ordering::Relaxed);
        self.detections_seen.fetch_add(detections, Ordering::Relaxed);
    }

    pub fn record_detector_failure(&self) {
        self.detector_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_burst(&self) {
        self.alert_bursts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sms_sent(&self) {
        self.sms_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sms_failed(&self) {
        self.sms_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_purge(&self) {
        self.purges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_purge_failure(&self) {
        self.purge_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot counters for the periodic summary.
    /// Interval values are swapped to zero so each report covers one window.
    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            cycles: self.cycles.load(Ordering::Relaxed),
            captures_ok: self.captures_ok.load(Ordering::Relaxed),
            captures_failed: self.captures_failed.load(Ordering::Relaxed),
            detector_runs: self.detector_runs.load(Ordering::Relaxed),
            detector_failures: self.detector_failures.load(Ordering::Relaxed),
            detections_seen: self.detections_seen.load(Ordering::Relaxed),
            alert_bursts: self.alert_bursts.load(Ordering::Relaxed),
            sms_sent: self.sms_sent.load(Ordering::Relaxed),
            sms_failed: self.sms_failed.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
            purge_failures: self.purge_failures.load(Ordering::Relaxed),
            interval_cycles: self.interval_cycles.swap(0, Ordering::Relaxed),
            cycle_latency_max_ms: self.cycle_latency_max_ms.swap(0, Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub cycles: u64,
    pub captures_ok: u64,
    pub captures_failed: u64,
    pub detector_runs: u64,
    pub detector_failures: u64,
    pub detections_seen: u64,
    pub alert_bursts: u64,
    pub sms_sent: u64,
    pub sms_failed: u64,
    pub purges: u64,
    pub purge_failures: u64,
    pub interval_cycles: u64,
    pub cycle_latency_max_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            cycles = %self.cycles,
            captures_ok = %self.captures_ok,
            captures_failed = %self.captures_failed,
            detector_runs = %self.detector_runs,
            detector_failures = %self.detector_failures,
            detections_seen = %self.detections_seen,
            alert_bursts = %self.alert_bursts,
            sms_sent = %self.sms_sent,
            sms_failed = %self.sms_failed,
            purges = %self.purges,
            purge_failures = %self.purge_failures,
            interval_cycles = %self.interval_cycles,
            cycle_latency_max_ms = %self.cycle_latency_max_ms,
            "metrics_summary"
        );
    }
}
