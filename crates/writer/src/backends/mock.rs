//! MockBackend - in-memory transactional sink
//!
//! Deterministic backend for tests and `backend.kind = "mock"` runs.
//! Failure injection is one-shot counters: the next N matching calls fail,
//! later calls succeed again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, SinkBackend, SinkConnection, TransactionBatch};
use tokio::time::sleep;

#[derive(Debug, Default)]
struct MockState {
    /// Committed payloads per destination, in commit order
    committed: Mutex<HashMap<String, Vec<Bytes>>>,
    fail_writes: AtomicU32,
    fail_commits: AtomicU32,
    fail_serialization: AtomicU32,
    fail_heartbeats: AtomicU32,
    write_delay_ms: AtomicU64,
    heartbeat_count: AtomicU64,
    fetched_batches: AtomicU64,
    aborted_transactions: AtomicU64,
    open_connections: AtomicU64,
    released_connections: AtomicU64,
}

/// Consume one unit from a one-shot failure counter
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// In-memory transactional backend with shared, inspectable state
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    /// Create a new mock backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` write calls with a streaming error
    pub fn fail_next_writes(&self, n: u32) {
        self.state.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` commit calls with a streaming error
    pub fn fail_next_commits(&self, n: u32) {
        self.state.fail_commits.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` write calls with a serialization error
    pub fn fail_next_writes_with_serialization(&self, n: u32) {
        self.state.fail_serialization.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` heartbeat calls with a streaming error
    pub fn fail_next_heartbeats(&self, n: u32) {
        self.state.fail_heartbeats.store(n, Ordering::SeqCst);
    }

    /// Delay every write call (for backpressure tests)
    pub fn set_write_delay(&self, delay: Duration) {
        self.state
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Committed payloads for a destination, in commit order
    pub fn committed(&self, destination: &str) -> Vec<Bytes> {
        self.state
            .committed
            .lock()
            .map(|committed| committed.get(destination).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Committed payloads decoded as JSON values
    pub fn committed_json(&self, destination: &str) -> Vec<serde_json::Value> {
        self.committed(destination)
            .iter()
            .filter_map(|payload| serde_json::from_slice(payload).ok())
            .collect()
    }

    /// Number of committed records for a destination
    pub fn committed_count(&self, destination: &str) -> usize {
        self.committed(destination).len()
    }

    /// Total heartbeat calls observed
    pub fn heartbeat_count(&self) -> u64 {
        self.state.heartbeat_count.load(Ordering::SeqCst)
    }

    /// Total transaction batches handed out
    pub fn fetched_batches(&self) -> u64 {
        self.state.fetched_batches.load(Ordering::SeqCst)
    }

    /// Total aborted transactions
    pub fn aborted_transactions(&self) -> u64 {
        self.state.aborted_transactions.load(Ordering::SeqCst)
    }

    /// Total connections opened
    pub fn open_connections(&self) -> u64 {
        self.state.open_connections.load(Ordering::SeqCst)
    }

    /// Total connections released
    pub fn released_connections(&self) -> u64 {
        self.state.released_connections.load(Ordering::SeqCst)
    }
}

impl SinkBackend for MockBackend {
    type Connection = MockConnection;

    async fn open_connection(&self, destination: &str) -> Result<MockConnection, ContractError> {
        self.state.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            destination: destination.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

/// Connection to the mock backend for one destination
pub struct MockConnection {
    destination: String,
    state: Arc<MockState>,
}

impl SinkConnection for MockConnection {
    type Batch = MockTransactionBatch;

    async fn fetch_batch(&mut self, txn_count: u32) -> Result<MockTransactionBatch, ContractError> {
        self.state.fetched_batches.fetch_add(1, Ordering::SeqCst);
        Ok(MockTransactionBatch {
            destination: self.destination.clone(),
            state: Arc::clone(&self.state),
            remaining: txn_count,
            transaction_open: false,
            staged: Vec::new(),
        })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.state.released_connections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One mock transaction batch handle
pub struct MockTransactionBatch {
    destination: String,
    state: Arc<MockState>,
    remaining: u32,
    transaction_open: bool,
    staged: Vec<Bytes>,
}

impl TransactionBatch for MockTransactionBatch {
    async fn begin_next_transaction(&mut self) -> Result<(), ContractError> {
        if self.remaining == 0 {
            return Err(ContractError::streaming(
                &self.destination,
                "transaction batch exhausted",
            ));
        }
        self.remaining -= 1;
        self.transaction_open = true;
        Ok(())
    }

    async fn write(&mut self, payload: Bytes) -> Result<(), ContractError> {
        let delay_ms = self.state.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            sleep(Duration::from_millis(delay_ms)).await;
        }
        if take_one(&self.state.fail_serialization) {
            return Err(ContractError::serialization("injected serialization failure"));
        }
        if take_one(&self.state.fail_writes) {
            return Err(ContractError::streaming(
                &self.destination,
                "injected write failure",
            ));
        }
        if !self.transaction_open {
            return Err(ContractError::streaming(
                &self.destination,
                "no open transaction",
            ));
        }
        self.staged.push(payload);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), ContractError> {
        if take_one(&self.state.fail_commits) {
            return Err(ContractError::streaming(
                &self.destination,
                "injected commit failure",
            ));
        }
        if !self.transaction_open {
            return Err(ContractError::streaming(
                &self.destination,
                "no open transaction",
            ));
        }
        let mut committed = self
            .state
            .committed
            .lock()
            .map_err(|_| ContractError::streaming(&self.destination, "state poisoned"))?;
        committed
            .entry(self.destination.clone())
            .or_default()
            .append(&mut self.staged);
        self.transaction_open = false;
        Ok(())
    }

    fn remaining_transactions(&self) -> u32 {
        self.remaining
    }

    async fn heartbeat(&mut self) -> Result<(), ContractError> {
        if take_one(&self.state.fail_heartbeats) {
            return Err(ContractError::streaming(
                &self.destination,
                "injected heartbeat failure",
            ));
        }
        self.state.heartbeat_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), ContractError> {
        self.staged.clear();
        self.transaction_open = false;
        self.state
            .aborted_transactions
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.transaction_open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_commit_visibility() {
        let backend = MockBackend::new();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(10).await.unwrap();

        batch.begin_next_transaction().await.unwrap();
        batch.write(Bytes::from_static(b"{\"a\":1}")).await.unwrap();
        assert_eq!(backend.committed_count("orders"), 0);

        batch.commit().await.unwrap();
        assert_eq!(backend.committed_count("orders"), 1);
        assert_eq!(batch.remaining_transactions(), 9);
    }

    #[tokio::test]
    async fn test_mock_abort_discards_staged() {
        let backend = MockBackend::new();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(10).await.unwrap();

        batch.begin_next_transaction().await.unwrap();
        batch.write(Bytes::from_static(b"{}")).await.unwrap();
        batch.abort().await.unwrap();

        batch.begin_next_transaction().await.unwrap();
        batch.commit().await.unwrap();
        assert_eq!(backend.committed_count("orders"), 0);
        assert_eq!(backend.aborted_transactions(), 1);
    }

    #[tokio::test]
    async fn test_mock_exhausted_batch_refuses_begin() {
        let backend = MockBackend::new();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(1).await.unwrap();

        batch.begin_next_transaction().await.unwrap();
        batch.commit().await.unwrap();
        assert_eq!(batch.remaining_transactions(), 0);
        assert!(batch.begin_next_transaction().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_failure_counters_are_one_shot() {
        let backend = MockBackend::new();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(10).await.unwrap();
        batch.begin_next_transaction().await.unwrap();

        backend.fail_next_writes(1);
        assert!(batch.write(Bytes::from_static(b"{}")).await.is_err());
        assert!(batch.write(Bytes::from_static(b"{}")).await.is_ok());
    }
}
