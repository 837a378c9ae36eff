//! Metrics collection for the DriftMQ producer

use std::sync::atomic::{AtomicU64, Ordering};

/// Producer metrics collector
#[derive(Debug, Default)]
pub struct ProducerMetrics {
    /// Messages accepted into the ingress queue
    pub records_queued: AtomicU64,
    /// Messages whose submission resolved successfully
    pub records_dispatched: AtomicU64,
    /// Dispatch cycles that produced at least one request
    pub batches_dispatched: AtomicU64,
    /// Wire requests handed to broker connections
    pub requests_issued: AtomicU64,
    /// Outer groups that resolved with a send failure
    pub send_errors: AtomicU64,
}

impl ProducerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record messages accepted into the ingress queue
    pub fn record_queued(&self, record_count: u64) {
        self.records_queued.fetch_add(record_count, Ordering::Relaxed);
    }

    /// Record a dispatch cycle
    pub fn record_batch(&self) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a wire request handed to a connection
    pub fn record_request(&self) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record messages whose submission resolved successfully
    pub fn record_dispatched(&self, record_count: u64) {
        self.records_dispatched
            .fetch_add(record_count, Ordering::Relaxed);
    }

    /// Record an outer group resolved with a send failure
    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_queued: self.records_queued.load(Ordering::Relaxed),
            records_dispatched: self.records_dispatched.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of producer metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_queued: u64,
    pub records_dispatched: u64,
    pub batches_dispatched: u64,
    pub requests_issued: u64,
    pub send_errors: u64,
}
