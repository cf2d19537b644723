// src/ingest/types.rs
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ingest::error::ValidationError;

/// URL placeholder for items whose origin is unknown.
pub const URL_UNKNOWN: &str = "N/A";

/// Closed set of source tags a [`Record`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Api,
    File,
    Web,
}

impl SourceTag {
    /// Fixed invocation order of the three source slots.
    pub const ORDER: [SourceTag; 3] = [SourceTag::Api, SourceTag::File, SourceTag::Web];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::Api => "api",
            SourceTag::File => "file",
            SourceTag::Web => "web",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(SourceTag::Api),
            "file" => Ok(SourceTag::File),
            "web" => Ok(SourceTag::Web),
            other => Err(ValidationError::InvalidSource(other.to_string())),
        }
    }
}

/// Canonical article. Only [`crate::ingest::validate::normalize`] builds one,
/// so every instance has a non-empty trimmed title and content.
///
/// Field order here is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) source: SourceTag,
    pub(crate) url: String,
    #[serde(rename = "fetchedAt")]
    pub(crate) fetched_at: DateTime<Utc>,
}

impl Record {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> SourceTag {
        self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Records of one orchestrator run, in source order (api, file, web).
pub type Aggregate = Vec<Record>;

/// Fetch contract shared by every source adapter.
///
/// Conforming adapters catch their own failures and return `Ok` with whatever
/// they salvaged (possibly nothing). The `Err` arm exists so the orchestrator
/// can absorb adapters that break that promise.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Record>>;
    fn name(&self) -> &'static str;
}
