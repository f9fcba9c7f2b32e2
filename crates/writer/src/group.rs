//! WriterGroup - routes records to per-destination writers and coordinates
//! flush and close across all of them

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{DestinationConfig, Record, SinkBackend, SinkBlueprint, WriterSettings};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::batch::{BatchConfig, TableBatch};
use crate::error::WriterError;
use crate::metrics::{DestinationMetrics, MetricsSnapshot};
use crate::writer::{DestinationWriter, WriterConfig};

/// Writer group configuration
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Destination set, fixed for the lifetime of the group
    pub destinations: Vec<DestinationConfig>,
    /// Writer tuning shared by all destinations
    pub settings: WriterSettings,
}

impl GroupConfig {
    /// Extract the group configuration from a blueprint
    pub fn from_blueprint(blueprint: &SinkBlueprint) -> Self {
        Self {
            destinations: blueprint.destinations.clone(),
            settings: blueprint.writer.clone(),
        }
    }
}

/// Builder for creating a WriterGroup
pub struct WriterGroupBuilder<B: SinkBackend> {
    config: GroupConfig,
    backend: B,
}

impl<B: SinkBackend> WriterGroupBuilder<B> {
    /// Create a new WriterGroupBuilder
    pub fn new(config: GroupConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// Build the group: open one connection and one first transaction per
    /// destination, then start the drain and heartbeat tasks
    #[instrument(
        name = "writer_group_build",
        skip(self),
        fields(destinations = self.config.destinations.len())
    )]
    pub async fn build(self) -> Result<WriterGroup, WriterError> {
        let cancel = CancellationToken::new();
        let mut writers = HashMap::with_capacity(self.config.destinations.len());

        for destination in &self.config.destinations {
            let writer = start_writer(
                &self.backend,
                destination,
                &self.config.settings,
                cancel.child_token(),
            )
            .await?;
            writers.insert(destination.name.clone(), writer);
        }

        info!(writers = writers.len(), "writer group started");
        Ok(WriterGroup { writers, cancel })
    }
}

/// Open the backend connection and start one DestinationWriter
#[instrument(
    name = "writer_group_start_writer",
    skip(backend, destination, settings, cancel),
    fields(destination = %destination.name)
)]
async fn start_writer<B: SinkBackend>(
    backend: &B,
    destination: &DestinationConfig,
    settings: &WriterSettings,
    cancel: CancellationToken,
) -> Result<DestinationWriter, WriterError> {
    let connection = backend
        .open_connection(&destination.name)
        .await
        .map_err(|e| WriterError::writer_creation(&destination.name, e.to_string()))?;

    let config = writer_config(settings, destination);
    let metrics = Arc::new(DestinationMetrics::new());
    let batch = TableBatch::open(
        destination.name.clone(),
        connection,
        config.batch.clone(),
        Arc::clone(&metrics),
        cancel.clone(),
    )
    .await
    .map_err(|e| WriterError::writer_creation(&destination.name, e.to_string()))?;

    Ok(DestinationWriter::spawn(batch, &config, metrics, cancel))
}

fn writer_config(settings: &WriterSettings, destination: &DestinationConfig) -> WriterConfig {
    WriterConfig {
        batch: BatchConfig {
            batch_size: destination.batch_size.unwrap_or(settings.batch_size),
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff(),
            transactions_per_batch: settings.transactions_per_batch,
            format: settings.format,
        },
        queue_capacity: settings.queue_capacity,
        heartbeat_interval: settings.heartbeat_interval(),
    }
}

/// Owns N independent destination writers and fans records out by key
pub struct WriterGroup {
    writers: HashMap<String, DestinationWriter>,
    cancel: CancellationToken,
}

impl WriterGroup {
    /// Route a record to the writer for its destination key. Records whose
    /// key matches no configured destination are ignored. Awaits queue
    /// capacity when the destination's queue is full.
    pub async fn add(&self, record: Record) {
        match self.writers.get(&record.destination) {
            Some(writer) => writer.enqueue(record).await,
            None => {
                debug!(
                    destination = %record.destination,
                    "no writer configured for destination, record ignored"
                );
            }
        }
    }

    /// Number of configured destinations
    pub fn destination_count(&self) -> usize {
        self.writers.len()
    }

    /// Get metrics for all destinations
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.writers
            .iter()
            .map(|(name, writer)| (name.clone(), writer.metrics().snapshot()))
            .collect()
    }

    /// Flush every destination concurrently (one task each) and wait for all
    /// of them; returns the summed cumulative committed count
    #[instrument(name = "writer_group_flush", skip(self))]
    pub async fn flush_and_wait(&self) -> u64 {
        let mut tasks = Vec::with_capacity(self.writers.len());
        for writer in self.writers.values() {
            tasks.push(tokio::spawn(writer.flush_task()));
        }

        let mut total = 0;
        for task in tasks {
            match task.await {
                Ok(committed) => total += committed,
                Err(e) => error!(error = ?e, "flush task panicked"),
            }
        }

        info!(total, "flush complete");
        total
    }

    /// Tear the group down: stop intake, terminate all drain and heartbeat
    /// loops, wait for them, and release backend connections. Consuming
    /// `self` makes a second close a compile error.
    ///
    /// There is no deadline on in-flight backend calls; a hung backend will
    /// block shutdown.
    #[instrument(name = "writer_group_close", skip(self))]
    pub async fn close(self) {
        info!(writers = self.writers.len(), "writer group closing");
        self.cancel.cancel();
        for (_, writer) in self.writers {
            writer.shutdown().await;
        }
        info!("writer group closed");
    }
}

/// Convenience function to create a writer group from a blueprint
pub async fn create_writer_group<B: SinkBackend>(
    blueprint: &SinkBlueprint,
    backend: B,
) -> Result<WriterGroup, WriterError> {
    WriterGroupBuilder::new(GroupConfig::from_blueprint(blueprint), backend)
        .build()
        .await
}
