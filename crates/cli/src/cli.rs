//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Txn Sinker - Batched transactional sink pipeline for streaming records
#[derive(Parser, Debug)]
#[command(
    name = "txn-sinker",
    author,
    version,
    about = "Batched transactional sink pipeline",
    long_about = "A batched transactional sink pipeline for streaming records.\n\n\
                  Routes incoming records by destination key, buffers them in \n\
                  bounded per-destination queues, and commits them to a \n\
                  transactional backend in bounded batches with retry and \n\
                  keep-alive handling."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TXN_SINKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TXN_SINKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sink pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "TXN_SINKER_CONFIG")]
    pub config: PathBuf,

    /// Override backend connection address from configuration
    #[arg(long, env = "TXN_SINKER_BACKEND_ADDRESS")]
    pub backend_address: Option<String>,

    /// Record source kind
    #[arg(long, value_enum, default_value = "mock", env = "TXN_SINKER_SOURCE")]
    pub source: SourceKindArg,

    /// JSON-lines input file (required for the file source)
    #[arg(long, env = "TXN_SINKER_INPUT")]
    pub input: Option<PathBuf>,

    /// Payload field carrying the destination key (removed before writing)
    #[arg(long, default_value = "topic", env = "TXN_SINKER_TOPIC_FIELD")]
    pub topic_field: String,

    /// Maximum number of records to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "TXN_SINKER_MAX_RECORDS")]
    pub max_records: u64,

    /// Mock source production rate in records per second
    #[arg(long, default_value = "100.0", env = "TXN_SINKER_RATE")]
    pub rate: f64,

    /// Periodic flush interval in seconds (0 = final flush only)
    #[arg(long, default_value = "10", env = "TXN_SINKER_FLUSH_INTERVAL")]
    pub flush_interval: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TXN_SINKER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between the source and the writer group
    #[arg(long, default_value = "100", env = "TXN_SINKER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TXN_SINKER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed destination information
    #[arg(long)]
    pub destinations: bool,
}

/// Record source kind
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum SourceKindArg {
    /// Synthetic records round-robined over configured destinations
    #[default]
    Mock,
    /// Replay a JSON-lines file
    File,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
