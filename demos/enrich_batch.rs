//! Enrich a JSON file of records and write media-server bundles
//!
//! ```bash
//! RUST_LOG=leak_enricher=debug cargo run --example enrich_batch -- records.json [config.json]
//! ```
//!
//! `records.json` holds an array of records as produced by the collector
//! (`video_id`/`id`, `leaked` or `status`, optional `author_id`, ...).

use leak_enricher::{BatchCoordinator, Config, Record};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let records_path = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: enrich_batch <records.json> [config.json]")?;
    let config = match args.next() {
        Some(path) => Config::from_json_file(&PathBuf::from(path))?,
        None => Config::default(),
    };

    let records: Vec<Record> = serde_json::from_str(&std::fs::read_to_string(&records_path)?)?;
    let coordinator = BatchCoordinator::from_config(&config)?;
    let run = coordinator.run_report(records, None).await;

    for batch in &run.batches {
        println!(
            "batch {}: {} records, {:?}, skip_network={}, rate limits at start={}",
            batch.index + 1,
            batch.size,
            batch.mode,
            batch.skip_network,
            batch.rate_limit_count
        );
    }
    for bundle in &run.results {
        println!("{} -> {}", bundle.id, bundle.nfo_path.display());
    }
    Ok(())
}
