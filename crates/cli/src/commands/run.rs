//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::{RunArgs, SourceKindArg};
use crate::pipeline::{Pipeline, PipelineConfig, SourceConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref address) = args.backend_address {
        info!(address = %address, "Overriding backend address from CLI");
        blueprint.backend.address = address.clone();
    }

    info!(
        backend = ?blueprint.backend.kind,
        destinations = blueprint.destinations.len(),
        batch_size = blueprint.writer.batch_size,
        max_retries = blueprint.writer.max_retries,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build the record source from CLI arguments
    let max_records = (args.max_records > 0).then_some(args.max_records);
    let source = match args.source {
        SourceKindArg::Mock => SourceConfig::Mock {
            destinations: blueprint
                .destinations
                .iter()
                .map(|d| d.name.clone())
                .collect(),
            rate_hz: args.rate,
            max_records,
        },
        SourceKindArg::File => {
            let path = args
                .input
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--input is required for the file source"))?;
            SourceConfig::File {
                path,
                topic_field: args.topic_field.clone(),
                max_records,
            }
        }
    };

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        source,
        flush_interval: (args.flush_interval > 0)
            .then(|| Duration::from_secs(args.flush_interval)),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        records_produced = stats.records_produced,
                        records_committed = stats.records_committed,
                        records_dropped = stats.records_dropped,
                        duration_secs = stats.duration.as_secs_f64(),
                        throughput = format!("{:.2}", stats.throughput()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Txn Sinker finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::SinkBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Backend:");
    println!("  Kind: {:?}", blueprint.backend.kind);
    if !blueprint.backend.address.is_empty() {
        println!("  Address: {}", blueprint.backend.address);
    }
    println!("\nWriter:");
    println!("  Batch size: {}", blueprint.writer.batch_size);
    println!("  Queue capacity: {}", blueprint.writer.queue_capacity);
    println!("  Max retries: {}", blueprint.writer.max_retries);
    println!("  Retry backoff: {}ms", blueprint.writer.retry_backoff_ms);
    println!(
        "  Heartbeat interval: {}s",
        blueprint.writer.heartbeat_interval_secs
    );
    println!("\nDestinations ({}):", blueprint.destinations.len());
    for destination in &blueprint.destinations {
        match destination.batch_size {
            Some(batch_size) => {
                println!("  - {} (batch_size = {})", destination.name, batch_size)
            }
            None => println!("  - {}", destination.name),
        }
    }
    println!();
}
