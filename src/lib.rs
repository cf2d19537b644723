// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::ingest::config::IngestConfig;
pub use crate::ingest::error::{FetchError, PersistError, ValidationError};
pub use crate::ingest::persist::{persist, JsonFileSink, RecordSink};
pub use crate::ingest::retry::{retry_transient, retry_with_backoff, RetryPolicy};
pub use crate::ingest::types::{Aggregate, Record, SourceAdapter, SourceTag, URL_UNKNOWN};
pub use crate::ingest::validate::normalize;
pub use crate::ingest::{run, run_once, SourceSlots};
