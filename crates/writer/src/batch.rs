//! TableBatch - per-destination batch state machine
//!
//! Owns the open transaction handle and the list of writes that are in the
//! transaction but not yet committed. Every state transition (drain write,
//! flush, heartbeat, retry) goes through [`TableBatch::perform`], and a
//! `TableBatch` is exclusively owned by its drain worker task, so no two
//! transitions can interleave.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, Record, RecordFormat, SinkConnection, TransactionBatch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics::DestinationMetrics;

/// What drove this pass through the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchAction {
    /// Normal write path (drain loop and flush)
    Write,
    /// Replay of buffered writes into a freshly opened transaction
    Retry,
    /// Keep-alive for an idle transaction
    Heartbeat,
}

/// Tuning for one destination's batch state machine
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Records per commit
    pub batch_size: usize,
    /// Retry attempts after a streaming failure (floor of 1 applied)
    pub max_retries: u32,
    /// Linear backoff increment between attempts
    pub retry_backoff: Duration,
    /// Transactions allocated per backend batch handle
    pub transactions_per_batch: u32,
    /// Record wire format
    pub format: RecordFormat,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_retries: 3,
            retry_backoff: Duration::from_millis(1_000),
            transactions_per_batch: 10,
            format: RecordFormat::Json,
        }
    }
}

/// Batch state machine for a single destination
pub(crate) struct TableBatch<C: SinkConnection> {
    destination: String,
    connection: C,
    /// Open transaction handle; absent only between abort/close and the next
    /// successful re-fetch
    txn_batch: Option<C::Batch>,
    /// Serialized writes in the open transaction, not yet committed
    pending: Vec<Bytes>,
    total_committed: u64,
    config: BatchConfig,
    metrics: Arc<DestinationMetrics>,
    cancel: CancellationToken,
}

impl<C: SinkConnection> TableBatch<C> {
    /// Open the state machine: fetch the first transaction batch and begin
    /// its first transaction.
    pub(crate) async fn open(
        destination: impl Into<String>,
        mut connection: C,
        config: BatchConfig,
        metrics: Arc<DestinationMetrics>,
        cancel: CancellationToken,
    ) -> Result<Self, ContractError> {
        let destination = destination.into();
        let mut txn_batch = connection.fetch_batch(config.transactions_per_batch).await?;
        txn_batch.begin_next_transaction().await?;
        debug!(destination = %destination, "table batch opened");

        Ok(Self {
            destination,
            connection,
            txn_batch: Some(txn_batch),
            pending: Vec::new(),
            total_committed: 0,
            config,
            metrics,
            cancel,
        })
    }

    pub(crate) fn destination(&self) -> &str {
        &self.destination
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn total_committed(&self) -> u64 {
        self.total_committed
    }

    /// Single entry point for all state transitions.
    ///
    /// Serialization-class failures are contained here (record or buffer kept,
    /// pipeline continues); streaming-class failures trigger abort + close and
    /// the bounded retry loop. Only cancellation propagates to the caller.
    pub(crate) async fn perform(
        &mut self,
        record: Option<Record>,
        flush_threshold: usize,
        action: BatchAction,
    ) -> Result<(), ContractError> {
        if action == BatchAction::Heartbeat {
            self.send_heartbeat().await;
            return Ok(());
        }

        match self
            .write_and_maybe_commit(record, flush_threshold, action)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_serialization() => {
                warn!(
                    destination = %self.destination,
                    error = %e,
                    "backend reported serialization error, record skipped"
                );
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                error!(destination = %self.destination, error = %e, "batch write failed");
                self.abort_and_close().await;
                if action == BatchAction::Retry {
                    // escalate to the retry loop instead of recursing
                    return Err(e);
                }
                self.recover().await
            }
        }
    }

    async fn write_and_maybe_commit(
        &mut self,
        record: Option<Record>,
        flush_threshold: usize,
        action: BatchAction,
    ) -> Result<(), ContractError> {
        if let Some(record) = record {
            let payload = match encode_record(&record, self.config.format) {
                Ok(payload) => payload,
                Err(e) => {
                    // A poison record must never block the pipeline
                    error!(
                        destination = %self.destination,
                        error = %e,
                        "failed to encode record, discarding"
                    );
                    self.metrics.inc_encode_failure_count();
                    return Ok(());
                }
            };

            self.pending.push(payload.clone());
            self.ensure_transaction().await?;
            if let Some(txn) = self.txn_batch.as_mut() {
                txn.write(payload).await?;
            }
        }

        if !self.pending.is_empty() && self.pending.len() >= flush_threshold {
            self.ensure_transaction().await?;

            if action == BatchAction::Retry {
                // the prior transaction was aborted, so its writes are void
                if let Some(txn) = self.txn_batch.as_mut() {
                    for payload in &self.pending {
                        txn.write(payload.clone()).await?;
                    }
                }
            }

            if let Some(txn) = self.txn_batch.as_mut() {
                txn.commit().await?;
            }

            let committed = self.pending.len() as u64;
            self.total_committed += committed;
            self.metrics.add_committed_count(committed);
            self.pending.clear();

            info!(
                destination = %self.destination,
                committed,
                total = self.total_committed,
                "committed batch"
            );

            self.rotate_transaction().await?;
        }

        Ok(())
    }

    /// Re-establish the transaction handle if it was lost to an exhausted
    /// recovery; the normal path already holds one.
    async fn ensure_transaction(&mut self) -> Result<(), ContractError> {
        if self.txn_batch.is_none() {
            debug!(destination = %self.destination, "no open transaction, fetching batch");
            let mut txn_batch = self
                .connection
                .fetch_batch(self.config.transactions_per_batch)
                .await?;
            txn_batch.begin_next_transaction().await?;
            self.txn_batch = Some(txn_batch);
        }
        Ok(())
    }

    /// After a commit: begin the next transaction in the batch, or replace an
    /// exhausted batch handle with a fresh one.
    async fn rotate_transaction(&mut self) -> Result<(), ContractError> {
        let remaining = self
            .txn_batch
            .as_ref()
            .map(|txn| txn.remaining_transactions())
            .unwrap_or(0);

        if remaining > 0 {
            if let Some(txn) = self.txn_batch.as_mut() {
                txn.begin_next_transaction().await?;
            }
        } else {
            if let Some(mut txn) = self.txn_batch.take() {
                txn.close().await?;
            }
            info!(destination = %self.destination, "fetching new transaction batch");
            let mut txn_batch = self
                .connection
                .fetch_batch(self.config.transactions_per_batch)
                .await?;
            txn_batch.begin_next_transaction().await?;
            self.txn_batch = Some(txn_batch);
        }

        Ok(())
    }

    /// Bounded retry loop with cumulative linear backoff: sleep k × backoff
    /// before attempt k, at most `max(1, max_retries)` attempts. Exhaustion
    /// drops the buffered records rather than blocking the pipeline.
    async fn recover(&mut self) -> Result<(), ContractError> {
        let mut remaining = self.config.max_retries.max(1);
        let mut backoff = Duration::ZERO;

        while remaining > 0 {
            backoff += self.config.retry_backoff;
            info!(
                destination = %self.destination,
                backoff_ms = backoff.as_millis() as u64,
                "will retry batch write"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    error!(destination = %self.destination, "retry interrupted by shutdown");
                    return Err(ContractError::Cancelled);
                }
                _ = sleep(backoff) => {}
            }

            self.metrics.inc_retry_count();
            match self.attempt_replay().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_cancelled() => {
                    error!(destination = %self.destination, "retry interrupted by shutdown");
                    return Err(e);
                }
                Err(e) => {
                    error!(destination = %self.destination, error = %e, "retry batch write failed");
                    self.abort_and_close().await;
                    remaining -= 1;
                }
            }
        }

        let dropped = self.pending.len() as u64;
        error!(
            destination = %self.destination,
            dropped,
            "retry batch write exhausted, dropping buffered records"
        );
        self.metrics.add_dropped_count(dropped);
        self.pending.clear();
        Ok(())
    }

    /// One retry attempt: fresh batch handle, fresh transaction, replay and
    /// commit everything buffered.
    async fn attempt_replay(&mut self) -> Result<(), ContractError> {
        let mut txn_batch = self
            .connection
            .fetch_batch(self.config.transactions_per_batch)
            .await?;
        txn_batch.begin_next_transaction().await?;
        self.txn_batch = Some(txn_batch);

        match self
            .write_and_maybe_commit(None, 1, BatchAction::Retry)
            .await
        {
            Err(e) if e.is_serialization() => {
                warn!(
                    destination = %self.destination,
                    error = %e,
                    "backend reported serialization error during replay"
                );
                Ok(())
            }
            other => other,
        }
    }

    async fn send_heartbeat(&mut self) {
        match self.txn_batch.as_mut() {
            Some(txn) => {
                if let Err(e) = txn.heartbeat().await {
                    // Heartbeat failure is never fatal; an expired transaction
                    // is recovered lazily on the next real write
                    warn!(destination = %self.destination, error = %e, "heartbeat failed");
                }
            }
            None => {
                debug!(destination = %self.destination, "no open transaction, heartbeat skipped");
            }
        }
    }

    /// Abort the open transaction and close the batch handle, best-effort
    async fn abort_and_close(&mut self) {
        if let Some(mut txn) = self.txn_batch.take() {
            if let Err(e) = txn.abort().await {
                error!(destination = %self.destination, error = %e, "failed to abort transaction");
            }
            if let Err(e) = txn.close().await {
                error!(destination = %self.destination, error = %e, "failed to close transaction batch");
            }
        }
    }

    /// Release the batch handle and the backend connection on shutdown
    pub(crate) async fn release(mut self) {
        if let Some(mut txn) = self.txn_batch.take() {
            if let Err(e) = txn.close().await {
                error!(destination = %self.destination, error = %e, "failed to close transaction batch");
            }
        }
        if let Err(e) = self.connection.close().await {
            error!(destination = %self.destination, error = %e, "failed to release backend connection");
        }
        debug!(destination = %self.destination, "backend connection released");
    }
}

/// Serialize a record payload with the configured wire format
fn encode_record(record: &Record, format: RecordFormat) -> Result<Bytes, ContractError> {
    let raw = match format {
        RecordFormat::Json => serde_json::to_vec(&record.value)
            .map_err(|e| ContractError::serialization(e.to_string()))?,
        RecordFormat::Bincode => bincode::serialize(&record.value)
            .map_err(|e| ContractError::serialization(e.to_string()))?,
    };
    Ok(Bytes::from(raw))
}
