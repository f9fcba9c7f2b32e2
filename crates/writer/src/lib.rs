//! # Writer
//!
//! 批量事务写入模块。
//!
//! 负责：
//! - 按 destination key 路由 `Record`
//! - 有界队列 + 独立 drain / heartbeat 任务（每个 destination 两个）
//! - 批量提交、事务轮换、有界线性退避重试

pub mod backends;
pub mod batch;
pub mod error;
pub mod group;
pub mod metrics;
pub mod writer;

pub use contracts::{Record, SinkBackend, SinkConnection, TransactionBatch};

pub use backends::{FileBackend, MockBackend};
pub use batch::BatchConfig;
pub use error::WriterError;
pub use group::{create_writer_group, GroupConfig, WriterGroup, WriterGroupBuilder};
pub use metrics::{DestinationMetrics, MetricsSnapshot};
pub use writer::{DestinationWriter, WriterConfig};
