//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total records handed to the pipeline by the source
    pub records_produced: u64,

    /// Source lines skipped (unparseable or unroutable)
    pub records_skipped: u64,

    /// Total records committed to the backend (cumulative at final flush)
    pub records_committed: u64,

    /// Total records dropped after retry exhaustion
    pub records_dropped: u64,

    /// Number of flush barriers performed
    pub flushes: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of configured destinations
    pub destinations: usize,

    /// Writer metrics aggregated across destinations
    pub writer_metrics: MetricsSummary,
}

impl PipelineStats {
    /// Calculate committed records per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_committed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate drop rate as percentage
    #[allow(dead_code)]
    pub fn drop_rate(&self) -> f64 {
        let total = self.records_committed + self.records_dropped;
        if total > 0 {
            (self.records_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview:");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Records produced: {}", self.records_produced);
        println!("  Records committed: {}", self.records_committed);
        println!("  Records dropped: {}", self.records_dropped);
        println!("  Source lines skipped: {}", self.records_skipped);
        println!("  Flushes: {}", self.flushes);
        println!("  Throughput: {:.2} records/s", self.throughput());
        println!("  Destinations: {}", self.destinations);

        println!("\nWriter Metrics:");
        println!("  Retry attempts: {}", self.writer_metrics.total_retries);
        println!(
            "  Encode failures: {}",
            self.writer_metrics.total_encode_failures
        );
        if !self.writer_metrics.committed_per_destination.is_empty() {
            println!("  Committed per destination:");
            for (destination, committed) in &self.writer_metrics.committed_per_destination {
                println!("    {destination}: {committed}");
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let stats = PipelineStats {
            records_committed: 100,
            duration: Duration::from_secs(4),
            ..Default::default()
        };
        assert!((stats.throughput() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_drop_rate_with_no_records() {
        let stats = PipelineStats::default();
        assert_eq!(stats.drop_rate(), 0.0);
    }
}
