//! `info` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&blueprint)
            .context("Failed to serialize configuration")?;
        println!("{}", json);
        return Ok(());
    }

    println!("\n=== Configuration: {} ===\n", args.config.display());
    println!("Version: {:?}", blueprint.version);
    println!("Backend: {:?}", blueprint.backend.kind);
    if !blueprint.backend.address.is_empty() {
        println!("Backend address: {}", blueprint.backend.address);
    }
    if !blueprint.backend.params.is_empty() {
        println!("Backend params:");
        for (key, value) in &blueprint.backend.params {
            println!("  {key} = {value}");
        }
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
    println!(
        "  Transactions per batch: {}",
        blueprint.writer.transactions_per_batch
    );
    println!("  Record format: {:?}", blueprint.writer.format);

    println!("\nDestinations: {}", blueprint.destinations.len());
    if args.destinations {
        for destination in &blueprint.destinations {
            let batch_size = destination
                .batch_size
                .unwrap_or(blueprint.writer.batch_size);
            println!("  - {} (batch_size = {})", destination.name, batch_size);
        }
    }

    println!();
    Ok(())
}
