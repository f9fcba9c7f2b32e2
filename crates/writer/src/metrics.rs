//! Per-destination writer metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Metrics for a single destination writer
#[derive(Debug, Default)]
pub struct DestinationMetrics {
    /// Current record queue length
    queue_len: AtomicUsize,
    /// Total records committed to the backend
    committed_count: AtomicU64,
    /// Total retry attempts performed
    retry_count: AtomicU64,
    /// Total records dropped after retry exhaustion
    dropped_count: AtomicU64,
    /// Total records discarded because they failed to encode
    encode_failure_count: AtomicU64,
}

impl DestinationMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get total committed record count
    pub fn committed_count(&self) -> u64 {
        self.committed_count.load(Ordering::Relaxed)
    }

    /// Add to committed record count
    pub fn add_committed_count(&self, n: u64) {
        self.committed_count.fetch_add(n, Ordering::Relaxed);
    }

    /// Get retry attempt count
    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Increment retry attempt count
    pub fn inc_retry_count(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped record count
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Add to dropped record count
    pub fn add_dropped_count(&self, n: u64) {
        self.dropped_count.fetch_add(n, Ordering::Relaxed);
    }

    /// Get encode failure count
    pub fn encode_failure_count(&self) -> u64 {
        self.encode_failure_count.load(Ordering::Relaxed)
    }

    /// Increment encode failure count
    pub fn inc_encode_failure_count(&self) {
        self.encode_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            committed_count: self.committed_count(),
            retry_count: self.retry_count(),
            dropped_count: self.dropped_count(),
            encode_failure_count: self.encode_failure_count(),
        }
    }
}

/// Snapshot of destination metrics (for reporting)
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub committed_count: u64,
    pub retry_count: u64,
    pub dropped_count: u64,
    pub encode_failure_count: u64,
}
