//! Transactional Batch Sink capability - the backend seam
//!
//! Defines the abstract interface the batch writer drives. Implementations
//! live outside the core (a real backend client) or in `writer::backends`
//! (mock / file) for tests and local runs.

use bytes::Bytes;

use crate::ContractError;

/// One backend-side transaction batch: a handle good for a bounded number of
/// committable transactions. Must be replaced once exhausted.
#[trait_variant::make(TransactionBatch: Send)]
pub trait LocalTransactionBatch {
    /// Begin the next transaction within this batch
    ///
    /// # Errors
    /// `Streaming` if no transactions remain
    async fn begin_next_transaction(&mut self) -> Result<(), ContractError>;

    /// Write one serialized record into the open transaction
    ///
    /// # Errors
    /// `Serialization` (record-level, non-fatal) or `Streaming` (batch-level)
    async fn write(&mut self, payload: Bytes) -> Result<(), ContractError>;

    /// Commit the open transaction as a single atomic unit
    async fn commit(&mut self) -> Result<(), ContractError>;

    /// Number of transactions still available in this batch
    fn remaining_transactions(&self) -> u32;

    /// Keep-alive for an idle open transaction
    async fn heartbeat(&mut self) -> Result<(), ContractError>;

    /// Abort the open transaction (best-effort)
    async fn abort(&mut self) -> Result<(), ContractError>;

    /// Close this batch handle (best-effort)
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// An open connection to the backend for a single destination
#[trait_variant::make(SinkConnection: Send)]
pub trait LocalSinkConnection {
    type Batch: TransactionBatch + Send;

    /// Allocate a handle good for up to `txn_count` transactions
    async fn fetch_batch(&mut self, txn_count: u32) -> Result<Self::Batch, ContractError>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Backend entry point: opens one connection per destination
#[trait_variant::make(SinkBackend: Send)]
pub trait LocalSinkBackend {
    type Connection: SinkConnection + Send + 'static;

    /// Open a connection for the named destination
    ///
    /// # Errors
    /// `Connection` on failure (should include context)
    async fn open_connection(&self, destination: &str) -> Result<Self::Connection, ContractError>;
}
