// src/ingest/error.rs
//! Error taxonomy for the ingest pipeline.
//!
//! * [`FetchError`] is what adapters see around their raw I/O. Only the
//!   `Transient` variant is eligible for retry.
//! * [`ValidationError`] rejects a single candidate record.
//! * [`PersistError`] is the one failure that reaches the caller of a run.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeouts, refused connections, rate limiting, server-side errors.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Auth rejection, missing input, malformed payloads, not found.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    /// Default classifier for [`crate::ingest::retry::retry_transient`].
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Map a non-success HTTP status. 401 gets its own message since it is
    /// the common misconfiguration.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        let code = status.as_u16();
        if status == StatusCode::UNAUTHORIZED {
            return Self::Permanent(format!("{context}: invalid credentials ({code} Unauthorized)"));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Self::Transient(format!("{context}: rate limit exceeded ({code})"));
        }
        if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
            return Self::Transient(format!("{context}: server error ({code})"));
        }
        Self::Permanent(format!("{context}: unexpected status {code}"))
    }

    /// Map a transport-level reqwest error.
    pub fn from_reqwest(err: &reqwest::Error, context: &str) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, context);
        }
        if err.is_timeout() {
            return Self::Transient(format!("{context}: request timed out"));
        }
        if err.is_connect() || err.is_request() {
            return Self::Transient(format!("{context}: connection error: {err}"));
        }
        Self::Permanent(format!("{context}: {err}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("content cannot be empty")]
    EmptyContent,

    #[error("title is {len} characters, limit is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("content is {len} characters, limit is {max}")]
    ContentTooLong { len: usize, max: usize },

    #[error("invalid source `{0}`, must be one of api, file, web")]
    InvalidSource(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("creating output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("persistence task aborted: {0}")]
    Aborted(String),
}
