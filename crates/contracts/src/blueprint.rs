//! SinkBlueprint - Config Loader output
//!
//! Describes the full sink pipeline configuration: backend connection,
//! writer tuning, and the fixed set of destinations.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete sink pipeline blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Backend connection settings
    pub backend: BackendConfig,

    /// Writer tuning applied to every destination (overridable per destination)
    #[serde(default)]
    pub writer: WriterSettings,

    /// Destination set, fixed at start and never resized at runtime
    pub destinations: Vec<DestinationConfig>,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Which built-in backend to use
    pub kind: BackendKind,

    /// Backend connection address (base directory for the file backend)
    #[serde(default)]
    pub address: String,

    /// Backend-specific string parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Built-in backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-memory backend, no external dependencies
    Mock,
    /// Append-only JSON-lines files, one directory per destination
    File,
}

/// Writer tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterSettings {
    /// Records per commit
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Bounded queue capacity per destination
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Retry attempts after a streaming failure (floor of 1 applied at runtime)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff increment between retry attempts (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Idle-transaction keep-alive period (seconds)
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Transactions allocated per backend batch handle
    #[serde(default = "default_transactions_per_batch")]
    pub transactions_per_batch: u32,

    /// Record wire format
    #[serde(default)]
    pub format: RecordFormat,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            transactions_per_batch: default_transactions_per_batch(),
            format: RecordFormat::default(),
        }
    }
}

impl WriterSettings {
    /// Backoff increment as a `Duration`
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Heartbeat period as a `Duration`
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_heartbeat_interval_secs() -> u64 {
    60
}

fn default_transactions_per_batch() -> u32 {
    10
}

/// Serialization format for record payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// One named destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Destination key records are routed by
    pub name: String,

    /// Per-destination batch size override
    #[serde(default)]
    pub batch_size: Option<usize>,
}
