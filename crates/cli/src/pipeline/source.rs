//! Record sources - mock generator and JSON-lines replay
//!
//! The replay source reads one JSON object per line and routes it by a
//! configurable payload field, which is removed from the value before the
//! record enters the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use contracts::Record;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Record source configuration
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// Synthetic records round-robined over the destination set
    Mock {
        destinations: Vec<String>,
        rate_hz: f64,
        max_records: Option<u64>,
    },
    /// Replay a JSON-lines file
    File {
        path: PathBuf,
        topic_field: String,
        max_records: Option<u64>,
    },
}

/// Totals reported by a finished source task
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceReport {
    /// Records handed to the pipeline
    pub produced: u64,
    /// Lines skipped (unparseable or missing the routing field)
    pub skipped: u64,
}

/// A record source running as a background task
pub struct RecordSource {
    config: SourceConfig,
}

impl RecordSource {
    /// Create a new record source
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    /// Start the source task, returning the record stream and the final report
    pub fn start(self, channel_capacity: usize) -> (mpsc::Receiver<Record>, JoinHandle<SourceReport>) {
        let (tx, rx) = mpsc::channel(channel_capacity);

        let handle = tokio::spawn(async move {
            match self.config {
                SourceConfig::Mock {
                    destinations,
                    rate_hz,
                    max_records,
                } => run_mock(tx, destinations, rate_hz, max_records).await,
                SourceConfig::File {
                    path,
                    topic_field,
                    max_records,
                } => run_file(tx, path, topic_field, max_records).await,
            }
        });

        (rx, handle)
    }
}

/// Generate synthetic records at a fixed rate
async fn run_mock(
    tx: mpsc::Sender<Record>,
    destinations: Vec<String>,
    rate_hz: f64,
    max_records: Option<u64>,
) -> SourceReport {
    let mut report = SourceReport::default();
    if destinations.is_empty() {
        warn!("mock source has no destinations, nothing to produce");
        return report;
    }

    let mut ticker = (rate_hz > 0.0).then(|| interval(Duration::from_secs_f64(1.0 / rate_hz)));
    let mut seq: u64 = 0;

    loop {
        if let Some(max) = max_records {
            if seq >= max {
                break;
            }
        }
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        let destination = &destinations[(seq as usize) % destinations.len()];
        let record = Record::new(
            destination,
            json!({"seq": seq, "payload": format!("record-{seq}")}),
        );
        if tx.send(record).await.is_err() {
            debug!("record channel closed, mock source stopping");
            break;
        }
        seq += 1;
        report.produced += 1;
    }

    info!(produced = report.produced, "mock source finished");
    report
}

/// Replay a JSON-lines file
async fn run_file(
    tx: mpsc::Sender<Record>,
    path: PathBuf,
    topic_field: String,
    max_records: Option<u64>,
) -> SourceReport {
    let mut report = SourceReport::default();

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open input file");
            return report;
        }
    };

    let mut lines = BufReader::new(file).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(max) = max_records {
            if report.produced >= max {
                break;
            }
        }

        match parse_line(&line, &topic_field) {
            Some(record) => {
                if tx.send(record).await.is_err() {
                    debug!("record channel closed, file source stopping");
                    break;
                }
                report.produced += 1;
            }
            None => {
                report.skipped += 1;
                debug!(field = %topic_field, "line without routing field skipped");
            }
        }
    }

    info!(
        produced = report.produced,
        skipped = report.skipped,
        "file source finished"
    );
    report
}

/// Parse one JSON line into a record, stripping the routing field
fn parse_line(line: &str, topic_field: &str) -> Option<Record> {
    let mut value: serde_json::Value = serde_json::from_str(line).ok()?;
    let routing = value.as_object_mut()?.remove(topic_field)?;
    let destination = routing.as_str()?.to_string();
    Some(Record::new(destination, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_line_strips_routing_field() {
        let record = parse_line(r#"{"topic": "orders", "id": 7}"#, "topic").unwrap();
        assert_eq!(record.destination, "orders");
        assert_eq!(record.value, json!({"id": 7}));
    }

    #[test]
    fn test_parse_line_without_routing_field() {
        assert!(parse_line(r#"{"id": 7}"#, "topic").is_none());
        assert!(parse_line("not json", "topic").is_none());
        assert!(parse_line(r#"{"topic": 42}"#, "topic").is_none());
    }

    #[tokio::test]
    async fn test_mock_source_respects_max_records() {
        let source = RecordSource::new(SourceConfig::Mock {
            destinations: vec!["a".to_string(), "b".to_string()],
            rate_hz: 0.0,
            max_records: Some(5),
        });

        let (mut rx, handle) = source.start(16);
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }

        let report = handle.await.unwrap();
        assert_eq!(report.produced, 5);
        assert_eq!(records.len(), 5);
        // round-robin over destinations
        assert_eq!(records[0].destination, "a");
        assert_eq!(records[1].destination, "b");
        assert_eq!(records[2].destination, "a");
    }

    #[tokio::test]
    async fn test_file_source_replays_and_skips() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        writeln!(input, r#"{{"topic": "orders", "id": 1}}"#).unwrap();
        writeln!(input, r#"{{"id": 2}}"#).unwrap();
        writeln!(input, r#"{{"topic": "orders", "id": 3}}"#).unwrap();
        input.flush().unwrap();

        let source = RecordSource::new(SourceConfig::File {
            path: input.path().to_path_buf(),
            topic_field: "topic".to_string(),
            max_records: None,
        });

        let (mut rx, handle) = source.start(16);
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }

        let report = handle.await.unwrap();
        assert_eq!(report.produced, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(records[0].value, json!({"id": 1}));
        assert_eq!(records[1].value, json!({"id": 3}));
    }
}
