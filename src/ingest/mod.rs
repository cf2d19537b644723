// src/ingest/mod.rs
pub mod config;
pub mod error;
pub mod persist;
pub mod providers;
pub mod retry;
pub mod types;
pub mod validate;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::ingest::config::IngestConfig;
use crate::ingest::error::PersistError;
use crate::ingest::persist::{JsonFileSink, RecordSink};
use crate::ingest::providers::{
    csv_file::CsvFileProvider, news_api::NewsApiProvider, web_page::WebPageProvider,
};
use crate::ingest::types::{Aggregate, Record, SourceAdapter, SourceTag};

/// One-time metrics registration (so series carry descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_records_total", "Records contributed per source.");
        describe_counter!(
            "ingest_items_skipped_total",
            "Candidate items rejected by validation."
        );
        describe_counter!(
            "ingest_source_failures_total",
            "Sources that contributed nothing because of an error, panic, timeout or setup failure."
        );
        describe_counter!(
            "ingest_retry_attempts_total",
            "Retries scheduled after transient failures."
        );
        describe_histogram!("ingest_fetch_ms", "Adapter fetch wall time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Adapter parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

/// One adapter per source; an empty slot contributes nothing.
#[derive(Clone, Default)]
pub struct SourceSlots {
    pub api: Option<Arc<dyn SourceAdapter>>,
    pub file: Option<Arc<dyn SourceAdapter>>,
    pub web: Option<Arc<dyn SourceAdapter>>,
}

impl SourceSlots {
    pub fn with_api(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.api = Some(Arc::new(adapter));
        self
    }

    pub fn with_file(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.file = Some(Arc::new(adapter));
        self
    }

    pub fn with_web(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.web = Some(Arc::new(adapter));
        self
    }

    /// Build the stock adapters. A source that cannot be set up (no API key)
    /// is logged and left empty.
    pub fn from_config(cfg: &IngestConfig) -> Self {
        Self::default().or_config(cfg)
    }

    /// Fill only the empty slots with stock adapters built from `cfg`; slots
    /// already holding an adapter are left alone and nothing is built for them.
    pub fn or_config(self, cfg: &IngestConfig) -> Self {
        Self {
            api: self.api.or_else(|| api_from_config(cfg)),
            file: self.file.or_else(|| {
                let csv: Arc<dyn SourceAdapter> = Arc::new(CsvFileProvider::new(cfg.csv_path.clone()));
                Some(csv)
            }),
            web: self.web.or_else(|| {
                let page: Arc<dyn SourceAdapter> = Arc::new(WebPageProvider::from_config(cfg));
                Some(page)
            }),
        }
    }

    fn into_ordered(self) -> [(SourceTag, Option<Arc<dyn SourceAdapter>>); 3] {
        [
            (SourceTag::Api, self.api),
            (SourceTag::File, self.file),
            (SourceTag::Web, self.web),
        ]
    }
}

fn api_from_config(cfg: &IngestConfig) -> Option<Arc<dyn SourceAdapter>> {
    match NewsApiProvider::from_config(cfg) {
        Ok(p) => {
            let api: Arc<dyn SourceAdapter> = Arc::new(p);
            Some(api)
        }
        Err(e) => {
            tracing::error!(target: "ingest", source = "api", error = %e, "adapter setup failed");
            counter!("ingest_source_failures_total", "source" => "api", "reason" => "setup")
                .increment(1);
            None
        }
    }
}

/// Fetch one source under `limit`. Every failure mode collapses to an empty
/// contribution.
async fn fetch_one(tag: SourceTag, adapter: Arc<dyn SourceAdapter>, limit: Duration) -> Vec<Record> {
    let t0 = Instant::now();
    let records = match tokio::time::timeout(limit, adapter.fetch()).await {
        Ok(Ok(records)) => records,
        Ok(Err(e)) => {
            tracing::error!(target: "ingest", source = %tag, adapter = adapter.name(), error = ?e, "adapter failed");
            counter!("ingest_source_failures_total", "source" => tag.as_str(), "reason" => "error")
                .increment(1);
            Vec::new()
        }
        Err(_) => {
            tracing::error!(
                target: "ingest",
                source = %tag,
                adapter = adapter.name(),
                timeout_ms = limit.as_millis() as u64,
                "adapter timed out"
            );
            counter!("ingest_source_failures_total", "source" => tag.as_str(), "reason" => "timeout")
                .increment(1);
            Vec::new()
        }
    };

    histogram!("ingest_fetch_ms", "source" => tag.as_str()).record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("ingest_records_total", "source" => tag.as_str()).increment(records.len() as u64);
    records
}

/// Run every filled slot concurrently and concatenate the results in
/// api, file, web order, whatever order they finish in.
///
/// Dropping the returned future aborts the in-flight adapters.
pub async fn collect(slots: SourceSlots, adapter_timeout: Duration) -> Aggregate {
    let mut set = JoinSet::new();
    let mut tag_of = HashMap::new();

    for (tag, adapter) in slots.into_ordered() {
        match adapter {
            Some(adapter) => {
                let handle = set.spawn(fetch_one(tag, adapter, adapter_timeout));
                tag_of.insert(handle.id(), tag);
            }
            None => tracing::debug!(target: "ingest", source = %tag, "no adapter in slot"),
        }
    }

    let mut per_source: HashMap<SourceTag, Vec<Record>> = HashMap::new();
    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((id, records)) => {
                if let Some(tag) = tag_of.get(&id) {
                    per_source.insert(*tag, records);
                }
            }
            Err(e) => {
                let tag = tag_of.get(&e.id()).copied();
                let source = tag.map(SourceTag::as_str).unwrap_or("unknown");
                tracing::error!(target: "ingest", source, error = %e, "adapter task panicked");
                counter!("ingest_source_failures_total", "source" => source, "reason" => "panic")
                    .increment(1);
            }
        }
    }

    SourceTag::ORDER
        .iter()
        .filter_map(|tag| per_source.remove(tag))
        .flatten()
        .collect()
}

/// One batch: gather from all slots, hand a non-empty aggregate to `sink`.
///
/// Source failures never surface here; the only error is a failed store.
pub async fn run_once(
    slots: SourceSlots,
    sink: &dyn RecordSink,
    adapter_timeout: Duration,
) -> Result<Aggregate, PersistError> {
    ensure_metrics_described();

    let records = collect(slots, adapter_timeout).await;

    let now = chrono::Utc::now().timestamp().max(0);
    gauge!("ingest_pipeline_last_run_ts").set(now as f64);

    if records.is_empty() {
        tracing::warn!(target: "ingest", "no articles gathered, nothing saved");
        return Ok(records);
    }

    if let Err(e) = sink.store(&records).await {
        tracing::error!(target: "ingest", dest = %sink.describe(), error = %e, "failed to save articles");
        return Err(e);
    }
    Ok(records)
}

/// Entry point used by the binary: slots left empty in `overrides` are
/// filled from `cfg`, output goes to `cfg.output_path`.
pub async fn run(cfg: &IngestConfig, overrides: SourceSlots) -> Result<Aggregate, PersistError> {
    let slots = overrides.or_config(cfg);
    let sink = JsonFileSink::new(cfg.output_path.clone());
    run_once(slots, &sink, cfg.adapter_timeout()).await
}
