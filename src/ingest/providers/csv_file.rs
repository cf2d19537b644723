// src/ingest/providers/csv_file.rs
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use metrics::histogram;

use crate::ingest::error::FetchError;
use crate::ingest::providers::accept;
use crate::ingest::types::{Record, SourceAdapter, SourceTag};

const REQUIRED_COLUMNS: [&str; 3] = ["title", "content", "url"];

/// Decoders tried in order. ISO-8859-1 maps bytes exactly like Latin-1, so
/// one entry covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Latin1,
}

const ENCODINGS: [Encoding; 2] = [Encoding::Utf8, Encoding::Latin1];

impl Encoding {
    fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(|s| {
                s.strip_prefix('\u{feff}').unwrap_or(s).to_string()
            }),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Local CSV file with `title`, `content` and `url` columns. Local I/O is
/// never retried: a missing or unreadable file means no data from here.
pub struct CsvFileProvider {
    path: PathBuf,
}

impl CsvFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parse decoded CSV text. Header problems fail the whole file; bad rows are
/// skipped with a warning carrying their line number.
pub fn parse_csv(text: &str) -> Result<Vec<Record>, FetchError> {
    let t0 = Instant::now();
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| FetchError::permanent(format!("csv: unreadable header: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(FetchError::permanent("csv: file is empty"));
    }

    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (title_ix, content_ix, url_ix) = match (column("title"), column("content"), column("url")) {
        (Some(t), Some(c), Some(u)) => (t, c, u),
        _ => {
            let missing: Vec<&str> = REQUIRED_COLUMNS
                .into_iter()
                .filter(|&c| column(c).is_none())
                .collect();
            return Err(FetchError::permanent(format!(
                "csv: missing required columns: {}",
                missing.join(", ")
            )));
        }
    };

    let mut out = Vec::new();
    for row in rdr.records() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                tracing::warn!(target: "ingest", line, error = %e, "skipping malformed csv row");
                continue;
            }
        };
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let field = |ix: usize| row.get(ix).unwrap_or_default().trim();
        let (title, content, url) = (field(title_ix), field(content_ix), field(url_ix));

        accept(
            &mut out,
            SourceTag::File,
            &format!("row {line}"),
            title,
            content,
            Some(url),
        );
    }

    histogram!("ingest_parse_ms", "source" => "file").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

#[async_trait]
impl SourceAdapter for CsvFileProvider {
    async fn fetch(&self) -> Result<Vec<Record>> {
        tracing::info!(target: "ingest", path = %self.path.display(), "reading CSV");

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(target: "ingest", path = %self.path.display(), "CSV file not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::error!(target: "ingest", path = %self.path.display(), error = %e, "CSV file unreadable");
                return Ok(Vec::new());
            }
        };

        for enc in ENCODINGS {
            let Some(text) = enc.decode(&bytes) else {
                tracing::debug!(target: "ingest", encoding = enc.label(), "CSV does not decode, trying next");
                continue;
            };
            match parse_csv(&text) {
                Ok(records) => {
                    tracing::info!(target: "ingest", count = records.len(), encoding = enc.label(), "got articles from CSV");
                    return Ok(records);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", encoding = enc.label(), error = %e, "CSV parse failed");
                }
            }
        }

        tracing::error!(target: "ingest", path = %self.path.display(), "CSV reading failed with all encodings");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
