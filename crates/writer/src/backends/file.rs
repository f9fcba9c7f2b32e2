//! FileBackend - append-only JSON-lines backend
//!
//! One directory per destination under a base path. A transaction batch
//! stages payloads in memory; commit appends them to `records.jsonl` and
//! writes a line to the `commits.log` ledger; abort discards the stage.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;
use contracts::{ContractError, SinkBackend, SinkConnection, TransactionBatch};
use tracing::{debug, instrument};

/// Backend that persists committed records as JSON lines on disk
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    /// Create a new FileBackend rooted at `base_path`
    #[instrument(name = "file_backend_new", skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        debug!(base_path = %base_path.display(), "file backend ready");
        Ok(Self { base_path })
    }
}

impl SinkBackend for FileBackend {
    type Connection = FileConnection;

    async fn open_connection(&self, destination: &str) -> Result<FileConnection, ContractError> {
        let dir = self.base_path.join(destination);
        fs::create_dir_all(&dir)
            .map_err(|e| ContractError::connection(destination, e.to_string()))?;

        Ok(FileConnection {
            destination: destination.to_string(),
            records_path: dir.join("records.jsonl"),
            ledger_path: dir.join("commits.log"),
        })
    }
}

/// Connection to one destination directory
pub struct FileConnection {
    destination: String,
    records_path: PathBuf,
    ledger_path: PathBuf,
}

impl SinkConnection for FileConnection {
    type Batch = FileTransactionBatch;

    async fn fetch_batch(&mut self, txn_count: u32) -> Result<FileTransactionBatch, ContractError> {
        Ok(FileTransactionBatch {
            destination: self.destination.clone(),
            records_path: self.records_path.clone(),
            ledger_path: self.ledger_path.clone(),
            remaining: txn_count,
            transaction_open: false,
            staged: Vec::new(),
        })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(destination = %self.destination, "file connection closed");
        Ok(())
    }
}

/// Transaction batch staging payloads until commit
pub struct FileTransactionBatch {
    destination: String,
    records_path: PathBuf,
    ledger_path: PathBuf,
    remaining: u32,
    transaction_open: bool,
    staged: Vec<Bytes>,
}

impl FileTransactionBatch {
    fn streaming_err(&self, e: impl std::fmt::Display) -> ContractError {
        ContractError::streaming(&self.destination, e.to_string())
    }

    fn append_staged(&mut self) -> std::io::Result<()> {
        let mut records = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.records_path)?;
        for payload in &self.staged {
            records.write_all(payload)?;
            records.write_all(b"\n")?;
        }
        records.flush()?;

        let mut ledger = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)?;
        writeln!(ledger, "{} {}", Utc::now().to_rfc3339(), self.staged.len())?;
        ledger.flush()?;

        Ok(())
    }
}

impl TransactionBatch for FileTransactionBatch {
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
        if !self.transaction_open {
            return Err(ContractError::streaming(
                &self.destination,
                "no open transaction",
            ));
        }
        self.append_staged().map_err(|e| self.streaming_err(e))?;
        self.staged.clear();
        self.transaction_open = false;
        Ok(())
    }

    fn remaining_transactions(&self) -> u32 {
        self.remaining
    }

    async fn heartbeat(&mut self) -> Result<(), ContractError> {
        // nothing expires on the file system
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), ContractError> {
        self.staged.clear();
        self.transaction_open = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.staged.clear();
        self.transaction_open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &PathBuf) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_file_commit_appends_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(10).await.unwrap();

        batch.begin_next_transaction().await.unwrap();
        batch.write(Bytes::from_static(b"{\"seq\":0}")).await.unwrap();
        batch.write(Bytes::from_static(b"{\"seq\":1}")).await.unwrap();
        batch.commit().await.unwrap();

        let lines = read_lines(&dir.path().join("orders/records.jsonl"));
        assert_eq!(lines, vec!["{\"seq\":0}", "{\"seq\":1}"]);

        let ledger = read_lines(&dir.path().join("orders/commits.log"));
        assert_eq!(ledger.len(), 1);
        assert!(ledger[0].ends_with(" 2"));
    }

    #[tokio::test]
    async fn test_file_abort_leaves_no_partial_lines() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(10).await.unwrap();

        batch.begin_next_transaction().await.unwrap();
        batch.write(Bytes::from_static(b"{\"seq\":0}")).await.unwrap();
        batch.abort().await.unwrap();

        assert!(!dir.path().join("orders/records.jsonl").exists());
    }

    #[tokio::test]
    async fn test_file_write_without_transaction_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let mut connection = backend.open_connection("orders").await.unwrap();
        let mut batch = connection.fetch_batch(1).await.unwrap();

        assert!(batch.write(Bytes::from_static(b"{}")).await.is_err());
    }
}
