//! DestinationWriter - one destination's bounded queue plus its two
//! background tasks (drain worker and heartbeat ticker)

use std::sync::Arc;
use std::time::Duration;

use contracts::{Record, SinkConnection};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use crate::batch::{BatchAction, BatchConfig, TableBatch};
use crate::metrics::DestinationMetrics;

/// Command channel depth; heartbeat ticks beyond this are skipped
const COMMAND_QUEUE_CAPACITY: usize = 8;

/// Runtime configuration for one destination writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Batch state machine tuning
    pub batch: BatchConfig,
    /// Bounded record queue capacity
    pub queue_capacity: usize,
    /// Idle-transaction keep-alive period
    pub heartbeat_interval: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            queue_capacity: 10_000,
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

/// Commands serviced by the drain worker, serialized through the same loop
/// that owns the batch state machine
pub(crate) enum WriterCommand {
    /// Commit whatever is buffered and report the cumulative committed count
    Flush { respond_to: oneshot::Sender<u64> },
    /// Keep an idle transaction alive
    Heartbeat,
}

/// Handle to a running destination writer
pub struct DestinationWriter {
    /// Destination name
    name: String,
    /// Bounded record queue; sending awaits capacity (backpressure)
    record_tx: mpsc::Sender<Record>,
    /// Flush/heartbeat command channel
    command_tx: mpsc::Sender<WriterCommand>,
    /// Shared metrics
    metrics: Arc<DestinationMetrics>,
    /// Cancellation for both background tasks
    cancel: CancellationToken,
    /// Drain worker task handle
    worker_handle: JoinHandle<()>,
    /// Heartbeat ticker task handle
    heartbeat_handle: JoinHandle<()>,
}

impl DestinationWriter {
    /// Spawn the drain worker and heartbeat ticker for an opened batch
    pub(crate) fn spawn<C>(
        batch: TableBatch<C>,
        config: &WriterConfig,
        metrics: Arc<DestinationMetrics>,
        cancel: CancellationToken,
    ) -> Self
    where
        C: SinkConnection + Send + 'static,
    {
        let name = batch.destination().to_string();
        let (record_tx, record_rx) = mpsc::channel(config.queue_capacity);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let worker_handle = tokio::spawn(drain_worker(
            batch,
            record_rx,
            command_rx,
            config.batch.batch_size,
            Arc::clone(&metrics),
            cancel.clone(),
            name.clone(),
        ));

        let heartbeat_handle = tokio::spawn(heartbeat_ticker(
            command_tx.clone(),
            config.heartbeat_interval,
            cancel.clone(),
            name.clone(),
        ));

        Self {
            name,
            record_tx,
            command_tx,
            metrics,
            cancel,
            worker_handle,
            heartbeat_handle,
        }
    }

    /// Get destination name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DestinationMetrics> {
        &self.metrics
    }

    /// Enqueue a record, awaiting queue capacity when full (backpressure;
    /// records are never dropped here)
    pub async fn enqueue(&self, record: Record) {
        if self.record_tx.send(record).await.is_err() {
            error!(destination = %self.name, "drain worker stopped, record discarded");
            return;
        }
        self.metrics
            .set_queue_len(self.record_tx.max_capacity() - self.record_tx.capacity());
    }

    /// Force a commit of whatever is buffered and wait for it; returns the
    /// cumulative committed count for this destination
    pub async fn flush_and_wait(&self) -> u64 {
        self.flush_task().await
    }

    /// Flush as an owned future, usable from a spawned task
    pub(crate) fn flush_task(&self) -> impl std::future::Future<Output = u64> + Send + 'static {
        let command_tx = self.command_tx.clone();
        let metrics = Arc::clone(&self.metrics);
        async move {
            let (respond_to, response) = oneshot::channel();
            if command_tx
                .send(WriterCommand::Flush { respond_to })
                .await
                .is_err()
            {
                return metrics.committed_count();
            }
            response
                .await
                .unwrap_or_else(|_| metrics.committed_count())
        }
    }

    /// Stop intake, terminate both background tasks and wait for them; the
    /// worker releases the backend connection on exit
    #[instrument(name = "destination_writer_shutdown", skip(self), fields(destination = %self.name))]
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.record_tx);
        drop(self.command_tx);

        if let Err(e) = self.worker_handle.await {
            error!(destination = %self.name, error = ?e, "drain worker panicked");
        }
        if let Err(e) = self.heartbeat_handle.await {
            error!(destination = %self.name, error = ?e, "heartbeat task panicked");
        }
        debug!(destination = %self.name, "destination writer shutdown complete");
    }
}

/// Drain loop: exclusively owns the batch state machine. Pulls records in
/// chunks bounded by the room left in the current batch and services flush
/// and heartbeat commands between chunks, so all three paths share one
/// critical section.
async fn drain_worker<C: SinkConnection>(
    mut batch: TableBatch<C>,
    mut record_rx: mpsc::Receiver<Record>,
    mut command_rx: mpsc::Receiver<WriterCommand>,
    batch_size: usize,
    metrics: Arc<DestinationMetrics>,
    cancel: CancellationToken,
    name: String,
) {
    debug!(destination = %name, "drain worker started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some(command) = command_rx.recv() => {
                if handle_command(&mut batch, command).await.is_err() {
                    break;
                }
            }

            maybe_record = record_rx.recv() => {
                let Some(record) = maybe_record else { break };

                // take at most the room left before the commit threshold,
                // without waiting for more records to arrive
                let room = batch_size.saturating_sub(batch.pending_len()).max(1);
                let mut drained = Vec::with_capacity(room);
                drained.push(record);
                while drained.len() < room {
                    match record_rx.try_recv() {
                        Ok(record) => drained.push(record),
                        Err(_) => break,
                    }
                }
                metrics.set_queue_len(record_rx.len());

                let mut cancelled = false;
                for record in drained {
                    if batch
                        .perform(Some(record), batch_size, BatchAction::Write)
                        .await
                        .is_err()
                    {
                        cancelled = true;
                        break;
                    }
                }
                if cancelled {
                    break;
                }
            }
        }
    }

    batch.release().await;
    debug!(destination = %name, "drain worker stopped");
}

/// Only cancellation errors escape the state machine; they end the loop
async fn handle_command<C: SinkConnection>(
    batch: &mut TableBatch<C>,
    command: WriterCommand,
) -> Result<(), contracts::ContractError> {
    match command {
        WriterCommand::Flush { respond_to } => {
            let result = batch.perform(None, 1, BatchAction::Write).await;
            let _ = respond_to.send(batch.total_committed());
            result
        }
        WriterCommand::Heartbeat => batch.perform(None, 0, BatchAction::Heartbeat).await,
    }
}

/// Heartbeat loop: periodically asks the drain worker to ping the open
/// transaction. A full command queue means the worker is mid-write, so the
/// transaction is not idle and the tick can be skipped.
async fn heartbeat_ticker(
    command_tx: mpsc::Sender<WriterCommand>,
    period: Duration,
    cancel: CancellationToken,
    name: String,
) {
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(mpsc::error::TrySendError::Closed(_)) =
                    command_tx.try_send(WriterCommand::Heartbeat)
                {
                    break;
                }
            }
        }
    }

    debug!(destination = %name, "heartbeat loop stopped");
}
