// src/ingest/validate.rs
use chrono::{DateTime, Utc};

use crate::ingest::error::ValidationError;
use crate::ingest::types::{Record, SourceTag, URL_UNKNOWN};

pub const TITLE_MAX_CHARS: usize = 1_000;
pub const CONTENT_MAX_CHARS: usize = 50_000;

/// Turn raw fields into a [`Record`], stamped with the current UTC time.
pub fn normalize(
    title: &str,
    content: &str,
    source: &str,
    url: Option<&str>,
) -> Result<Record, ValidationError> {
    normalize_at(title, content, source, url, Utc::now())
}

/// Same as [`normalize`] with an explicit `fetchedAt` stamp.
pub fn normalize_at(
    title: &str,
    content: &str,
    source: &str,
    url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Record, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }

    let title_len = title.chars().count();
    if title_len > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            len: title_len,
            max: TITLE_MAX_CHARS,
        });
    }
    let content_len = content.chars().count();
    if content_len > CONTENT_MAX_CHARS {
        return Err(ValidationError::ContentTooLong {
            len: content_len,
            max: CONTENT_MAX_CHARS,
        });
    }

    let source: SourceTag = source.parse()?;

    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(URL_UNKNOWN);

    Ok(Record {
        title: title.to_string(),
        content: content.to_string(),
        source,
        url: url.to_string(),
        fetched_at: now,
    })
}
