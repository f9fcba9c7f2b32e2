//! Writer 指标收集模块
//!
//! 基于 destination 级别的计数快照收集写入指标。

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// 记录新提交的记录数 (增量)
pub fn record_commit(destination: &str, committed: u64) {
    counter!("txn_sinker_committed_records_total", "destination" => destination.to_string())
        .increment(committed);
}

/// 记录重试次数 (增量)
pub fn record_retries(destination: &str, retries: u64) {
    counter!("txn_sinker_retries_total", "destination" => destination.to_string())
        .increment(retries);
}

/// 记录重试耗尽后被丢弃的记录数
pub fn record_records_dropped(destination: &str, dropped: u64) {
    counter!("txn_sinker_dropped_records_total", "destination" => destination.to_string())
        .increment(dropped);
}

/// 记录当前队列深度
pub fn record_queue_depth(destination: &str, depth: usize) {
    gauge!("txn_sinker_queue_depth", "destination" => destination.to_string()).set(depth as f64);
}

/// 记录一次 flush 的耗时 (毫秒)
pub fn record_flush(total_committed: u64, elapsed_ms: f64) {
    gauge!("txn_sinker_total_committed").set(total_committed as f64);
    histogram!("txn_sinker_flush_duration_ms").record(elapsed_ms);
}

/// Cross-destination aggregation for end-of-run reporting
#[derive(Debug, Clone, Default)]
pub struct WriterMetricsAggregator {
    per_destination: BTreeMap<String, DestinationTotals>,
}

#[derive(Debug, Clone, Copy, Default)]
struct DestinationTotals {
    committed: u64,
    retries: u64,
    dropped: u64,
    encode_failures: u64,
}

impl WriterMetricsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the latest snapshot for one destination (replaces any earlier
    /// observation for the same destination; counts are cumulative already)
    pub fn observe(
        &mut self,
        destination: &str,
        committed: u64,
        retries: u64,
        dropped: u64,
        encode_failures: u64,
    ) {
        self.per_destination.insert(
            destination.to_string(),
            DestinationTotals {
                committed,
                retries,
                dropped,
                encode_failures,
            },
        );
    }

    /// Summarize across destinations
    pub fn summary(&self) -> MetricsSummary {
        let mut summary = MetricsSummary::default();
        for (destination, totals) in &self.per_destination {
            summary.total_committed += totals.committed;
            summary.total_retries += totals.retries;
            summary.total_dropped += totals.dropped;
            summary.total_encode_failures += totals.encode_failures;
            summary
                .committed_per_destination
                .push((destination.clone(), totals.committed));
        }
        summary
    }
}

/// Aggregated view across destinations (for reporting)
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_committed: u64,
    pub total_retries: u64,
    pub total_dropped: u64,
    pub total_encode_failures: u64,
    pub committed_per_destination: Vec<(String, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_sums_destinations() {
        let mut aggregator = WriterMetricsAggregator::new();
        aggregator.observe("orders", 10, 1, 0, 0);
        aggregator.observe("payments", 5, 0, 2, 1);
        // later snapshot replaces the earlier one
        aggregator.observe("orders", 12, 1, 0, 0);

        let summary = aggregator.summary();
        assert_eq!(summary.total_committed, 17);
        assert_eq!(summary.total_retries, 1);
        assert_eq!(summary.total_dropped, 2);
        assert_eq!(summary.total_encode_failures, 1);
        assert_eq!(summary.committed_per_destination.len(), 2);
    }
}
