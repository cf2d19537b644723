//! Batch ingest: binary entrypoint
//! Loads layered config, runs every source once and writes the JSON feed.

use anyhow::Context;
use multi_source_ingestion::{run, IngestConfig, SourceSlots};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// RUST_LOG picks the filter (default `info`); INGEST_LOG_FORMAT=json
/// switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("INGEST_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = IngestConfig::load_default().context("loading ingest config")?;
    tracing::info!(
        output = %cfg.output_path.display(),
        csv = %cfg.csv_path.display(),
        api_key_set = cfg.newsapi_api_key.is_some(),
        "starting ingest run"
    );

    let records = run(&cfg, SourceSlots::default())
        .await
        .with_context(|| format!("saving articles to {}", cfg.output_path.display()))?;

    tracing::info!(count = records.len(), "ingest run finished");
    Ok(())
}
