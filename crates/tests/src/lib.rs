//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需外部 backend）
//! - 故障注入与恢复路径验证

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{DestinationConfig, Record, RecordFormat, WriterSettings};
    use serde_json::json;
    use tokio::time::sleep;
    use writer::{GroupConfig, MockBackend, WriterGroup, WriterGroupBuilder};

    fn settings(batch_size: usize) -> WriterSettings {
        WriterSettings {
            batch_size,
            queue_capacity: 256,
            max_retries: 2,
            retry_backoff_ms: 10,
            heartbeat_interval_secs: 60,
            transactions_per_batch: 10,
            format: RecordFormat::Json,
        }
    }

    fn group_config(names: &[&str], batch_size: usize) -> GroupConfig {
        GroupConfig {
            destinations: names
                .iter()
                .map(|name| DestinationConfig {
                    name: name.to_string(),
                    batch_size: None,
                })
                .collect(),
            settings: settings(batch_size),
        }
    }

    async fn build_group(backend: &MockBackend, config: GroupConfig) -> WriterGroup {
        WriterGroupBuilder::new(config, backend.clone())
            .build()
            .await
            .unwrap()
    }

    /// End-to-end test: producer -> WriterGroup -> MockBackend
    ///
    /// 验证完整的数据流：
    /// 1. 生产者按 destination key 投递记录
    /// 2. WriterGroup 路由到独立的 DestinationWriter
    /// 3. 批量提交到 backend，且保持入队顺序
    #[tokio::test]
    async fn test_e2e_order_preserved_per_destination() {
        let backend = MockBackend::new();
        let group = build_group(&backend, group_config(&["orders", "payments"], 3)).await;

        for i in 0..20u64 {
            let destination = if i % 2 == 0 { "orders" } else { "payments" };
            group.add(Record::new(destination, json!({"seq": i}))).await;
        }
        sleep(Duration::from_millis(100)).await;

        let total = group.flush_and_wait().await;
        assert_eq!(total, 20);

        // per-destination FIFO relative to enqueue order
        let orders: Vec<u64> = backend
            .committed_json("orders")
            .into_iter()
            .map(|v| v["seq"].as_u64().unwrap())
            .collect();
        let payments: Vec<u64> = backend
            .committed_json("payments")
            .into_iter()
            .map(|v| v["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(orders, (0..20).filter(|i| i % 2 == 0).collect::<Vec<_>>());
        assert_eq!(payments, (0..20).filter(|i| i % 2 == 1).collect::<Vec<_>>());

        group.close().await;
        assert_eq!(backend.released_connections(), 2);
    }

    /// Scenario: batchSize=2, enqueue A, B, C - two commits, the second
    /// triggered by an explicit flush
    #[tokio::test]
    async fn test_e2e_flush_commits_partial_batch() {
        let backend = MockBackend::new();
        let group = build_group(&backend, group_config(&["orders"], 2)).await;

        for i in 0..3u64 {
            group.add(Record::new("orders", json!({"seq": i}))).await;
        }
        sleep(Duration::from_millis(50)).await;

        // {A, B} committed at the threshold, C still buffered
        assert_eq!(backend.committed_count("orders"), 2);

        let total = group.flush_and_wait().await;
        assert_eq!(total, 3);
        assert_eq!(backend.committed_count("orders"), 3);

        group.close().await;
    }

    /// Scenario: commit fails once, replay commits the same batch exactly once
    #[tokio::test]
    async fn test_e2e_retry_replays_without_duplication() {
        let backend = MockBackend::new();
        let group = build_group(&backend, group_config(&["orders"], 2)).await;

        backend.fail_next_commits(1);
        group.add(Record::new("orders", json!({"seq": 0}))).await;
        group.add(Record::new("orders", json!({"seq": 1}))).await;
        sleep(Duration::from_millis(200)).await;

        let total = group.flush_and_wait().await;
        assert_eq!(total, 2);

        let orders: Vec<u64> = backend
            .committed_json("orders")
            .into_iter()
            .map(|v| v["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(backend.aborted_transactions(), 1);

        group.close().await;
    }

    /// Scenario: every retry fails - the batch is dropped, later records
    /// still commit
    #[tokio::test]
    async fn test_e2e_retry_exhaustion_drops_batch_only() {
        let backend = MockBackend::new();
        let group = build_group(&backend, group_config(&["orders"], 2)).await;

        // initial commit + 2 retry attempts
        backend.fail_next_commits(3);
        group.add(Record::new("orders", json!({"seq": 0}))).await;
        group.add(Record::new("orders", json!({"seq": 1}))).await;
        sleep(Duration::from_millis(300)).await;

        assert_eq!(group.flush_and_wait().await, 0);
        assert_eq!(backend.committed_count("orders"), 0);

        // the pipeline is not wedged: fresh records commit normally
        group.add(Record::new("orders", json!({"seq": 2}))).await;
        group.add(Record::new("orders", json!({"seq": 3}))).await;
        sleep(Duration::from_millis(100)).await;

        assert_eq!(group.flush_and_wait().await, 2);
        let metrics = group.metrics();
        let (_, snapshot) = metrics
            .iter()
            .find(|(name, _)| name == "orders")
            .unwrap();
        assert_eq!(snapshot.dropped_count, 2);
        assert_eq!(snapshot.committed_count, 2);

        group.close().await;
    }

    /// A serialization-class failure on one record leaves the rest of the
    /// stream untouched
    #[tokio::test]
    async fn test_e2e_poison_record_does_not_block() {
        let backend = MockBackend::new();
        let group = build_group(&backend, group_config(&["orders"], 2)).await;

        backend.fail_next_writes_with_serialization(1);
        for i in 0..4u64 {
            group.add(Record::new("orders", json!({"seq": i}))).await;
        }
        sleep(Duration::from_millis(100)).await;
        group.flush_and_wait().await;

        // record 0 was rejected by the backend; no abort, no retry
        let orders: Vec<u64> = backend
            .committed_json("orders")
            .into_iter()
            .map(|v| v["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(backend.aborted_transactions(), 0);

        group.close().await;
    }

    /// Records for unconfigured destinations are ignored without error
    #[tokio::test]
    async fn test_e2e_unknown_destination_ignored() {
        let backend = MockBackend::new();
        let group = build_group(&backend, group_config(&["orders"], 2)).await;

        group.add(Record::new("unknown", json!({"seq": 0}))).await;
        group.add(Record::new("orders", json!({"seq": 1}))).await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(group.flush_and_wait().await, 1);
        assert_eq!(backend.committed_count("unknown"), 0);

        group.close().await;
    }

    /// Config loading feeds the group builder end to end
    #[tokio::test]
    async fn test_e2e_from_config_file() {
        let content = r#"
[backend]
kind = "mock"

[writer]
batch_size = 2
retry_backoff_ms = 10

[[destinations]]
name = "position"

[[destinations]]
name = "instrument"

[[destinations]]
name = "transaction"
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let backend = MockBackend::new();
        let group = writer::create_writer_group(&blueprint, backend.clone())
            .await
            .unwrap();
        assert_eq!(group.destination_count(), 3);

        group
            .add(Record::new("position", json!({"seq": 0})))
            .await;
        group
            .add(Record::new("instrument", json!({"seq": 1})))
            .await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(group.flush_and_wait().await, 2);
        group.close().await;
        assert_eq!(backend.released_connections(), 3);
    }
}
