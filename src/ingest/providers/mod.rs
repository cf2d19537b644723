// src/ingest/providers/mod.rs
pub mod csv_file;
pub mod news_api;
pub mod web_page;

use metrics::counter;

use crate::ingest::types::{Record, SourceTag};
use crate::ingest::validate::normalize;

/// Run one candidate through the validator. Rejected items are logged,
/// counted and dropped; the rest of the batch carries on.
pub(crate) fn accept(
    out: &mut Vec<Record>,
    source: SourceTag,
    item: &str,
    title: &str,
    content: &str,
    url: Option<&str>,
) {
    match normalize(title, content, source.as_str(), url) {
        Ok(rec) => out.push(rec),
        Err(e) => {
            tracing::warn!(target: "ingest", %source, item, error = %e, "skipping item");
            counter!("ingest_items_skipped_total", "source" => source.as_str()).increment(1);
        }
    }
}
