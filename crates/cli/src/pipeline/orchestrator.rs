//! Pipeline orchestrator - coordinates source, writer group and backend.
//!
//! The backend is selected from the blueprint; mock and file backends are
//! built in, so a run needs no external services.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{BackendKind, Record, SinkBlueprint};
use observability::WriterMetricsAggregator;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant as TokioInstant};
use tracing::{error, info, warn};
use writer::{create_writer_group, FileBackend, MockBackend, SinkBackend, WriterGroup};

use super::source::{RecordSource, SourceConfig};
use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The sink blueprint
    pub blueprint: SinkBlueprint,

    /// Record source feeding the pipeline
    pub source: SourceConfig,

    /// Periodic flush interval (None = final flush only)
    pub flush_interval: Option<Duration>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size between source and writer group
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        match self.config.blueprint.backend.kind {
            BackendKind::Mock => {
                info!("Running with in-memory mock backend");
                let backend = MockBackend::new();
                self.run_with_backend(backend).await
            }
            BackendKind::File => {
                let backend = FileBackend::new(&self.config.blueprint.backend.address)
                    .context("Failed to prepare file backend directory")?;
                self.run_with_backend(backend).await
            }
        }
    }

    async fn run_with_backend<B: SinkBackend>(self, backend: B) -> Result<PipelineStats> {
        let start_time = Instant::now();

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Start writer group: opens one connection + first transaction per
        // destination, failing fast on backend errors
        info!(
            destinations = self.config.blueprint.destinations.len(),
            batch_size = self.config.blueprint.writer.batch_size,
            "Starting writer group..."
        );
        let group = create_writer_group(&self.config.blueprint, backend)
            .await
            .context("Failed to start writer group")?;

        // Start record source
        let source = RecordSource::new(self.config.source.clone());
        let (mut records, source_handle) = source.start(self.config.buffer_size);

        let mut stats = PipelineStats {
            destinations: group.destination_count(),
            ..Default::default()
        };
        let mut last_committed: HashMap<String, u64> = HashMap::new();

        // Ingest until the source completes or the timeout fires
        let ingest = ingest_loop(
            &group,
            &mut records,
            &mut stats,
            &mut last_committed,
            self.config.flush_interval,
        );
        match self.config.timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, ingest).await.is_err() {
                    warn!("Pipeline timeout reached, stopping intake");
                }
            }
            None => ingest.await,
        }

        // Stop the source and let the drain workers empty their queues
        drop(records);
        for _ in 0..100 {
            if group.metrics().iter().all(|(_, s)| s.queue_len == 0) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        // Final barrier: commit everything still buffered
        let flush_started = Instant::now();
        stats.records_committed = group.flush_and_wait().await;
        stats.flushes += 1;
        observability::record_flush(
            stats.records_committed,
            flush_started.elapsed().as_secs_f64() * 1000.0,
        );

        collect_writer_metrics(&group, &mut stats);
        group.close().await;

        match source_handle.await {
            Ok(report) => {
                stats.records_produced = report.produced;
                stats.records_skipped = report.skipped;
            }
            Err(e) => error!(error = ?e, "source task panicked"),
        }

        stats.duration = start_time.elapsed();
        Ok(stats)
    }
}

/// Consume records from the source and route them into the group; an optional
/// ticker triggers periodic flush barriers between records.
async fn ingest_loop(
    group: &WriterGroup,
    records: &mut mpsc::Receiver<Record>,
    stats: &mut PipelineStats,
    last_committed: &mut HashMap<String, u64>,
    flush_interval: Option<Duration>,
) {
    let mut ticker =
        flush_interval.map(|period| interval_at(TokioInstant::now() + period, period));

    loop {
        match ticker.as_mut() {
            Some(ticker) => {
                tokio::select! {
                    _ = ticker.tick() => {
                        periodic_flush(group, stats, last_committed).await;
                    }
                    maybe_record = records.recv() => {
                        let Some(record) = maybe_record else { break };
                        group.add(record).await;
                    }
                }
            }
            None => {
                let Some(record) = records.recv().await else { break };
                group.add(record).await;
            }
        }
    }
}

/// Flush all destinations and publish commit deltas and queue depths
async fn periodic_flush(
    group: &WriterGroup,
    stats: &mut PipelineStats,
    last_committed: &mut HashMap<String, u64>,
) {
    let started = Instant::now();
    let total = group.flush_and_wait().await;
    stats.flushes += 1;
    observability::record_flush(total, started.elapsed().as_secs_f64() * 1000.0);

    for (name, snapshot) in group.metrics() {
        let last = last_committed.entry(name.clone()).or_insert(0);
        if snapshot.committed_count > *last {
            observability::record_commit(&name, snapshot.committed_count - *last);
            *last = snapshot.committed_count;
        }
        observability::record_queue_depth(&name, snapshot.queue_len);
    }
}

/// Publish final per-destination totals and fold them into the run stats
fn collect_writer_metrics(group: &WriterGroup, stats: &mut PipelineStats) {
    let mut aggregator = WriterMetricsAggregator::new();

    for (name, snapshot) in group.metrics() {
        observability::record_retries(&name, snapshot.retry_count);
        observability::record_records_dropped(&name, snapshot.dropped_count);
        aggregator.observe(
            &name,
            snapshot.committed_count,
            snapshot.retry_count,
            snapshot.dropped_count,
            snapshot.encode_failure_count,
        );
        stats.records_dropped += snapshot.dropped_count;
    }

    stats.writer_metrics = aggregator.summary();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BackendConfig, ConfigVersion, DestinationConfig, WriterSettings};

    fn mock_blueprint(destinations: &[&str], batch_size: usize) -> SinkBlueprint {
        SinkBlueprint {
            version: ConfigVersion::V1,
            backend: BackendConfig {
                kind: BackendKind::Mock,
                address: String::new(),
                params: HashMap::new(),
            },
            writer: WriterSettings {
                batch_size,
                ..WriterSettings::default()
            },
            destinations: destinations
                .iter()
                .map(|name| DestinationConfig {
                    name: name.to_string(),
                    batch_size: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_pipeline_run_with_mock_source() {
        let config = PipelineConfig {
            blueprint: mock_blueprint(&["orders", "payments"], 4),
            source: SourceConfig::Mock {
                destinations: vec!["orders".to_string(), "payments".to_string()],
                rate_hz: 0.0,
                max_records: Some(10),
            },
            flush_interval: None,
            timeout: None,
            buffer_size: 16,
            metrics_port: None,
        };

        let stats = Pipeline::new(config).run().await.unwrap();
        assert_eq!(stats.records_produced, 10);
        assert_eq!(stats.records_committed, 10);
        assert_eq!(stats.records_dropped, 0);
        assert_eq!(stats.destinations, 2);
        assert!(stats.flushes >= 1);
    }

    #[tokio::test]
    async fn test_pipeline_timeout_stops_unbounded_source() {
        let config = PipelineConfig {
            blueprint: mock_blueprint(&["orders"], 10),
            source: SourceConfig::Mock {
                destinations: vec!["orders".to_string()],
                rate_hz: 1000.0,
                max_records: None,
            },
            flush_interval: None,
            timeout: Some(Duration::from_millis(200)),
            buffer_size: 16,
            metrics_port: None,
        };

        let stats = Pipeline::new(config).run().await.unwrap();
        assert!(stats.records_committed > 0);
    }
}
