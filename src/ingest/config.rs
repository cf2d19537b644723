// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::retry::RetryPolicy;

const ENV_PATH: &str = "INGEST_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/ingest.toml";

fn default_query() -> String {
    "India".to_string()
}
fn default_api_max_articles() -> usize {
    5
}
fn default_web_max_articles() -> usize {
    3
}
fn default_web_url() -> String {
    "https://www.bbc.com/news/world/asia/india".to_string()
}
fn default_csv_path() -> PathBuf {
    PathBuf::from("sample_data.csv")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("output/articles.json")
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    2_000
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_adapter_timeout_secs() -> u64 {
    60
}
fn default_politeness_delay_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Read from `NEWSAPI_API_KEY` only; a key in the TOML file is ignored.
    #[serde(skip)]
    pub newsapi_api_key: Option<String>,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_api_max_articles")]
    pub api_max_articles: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub newsapi_timeout_secs: u64,

    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    #[serde(default = "default_web_url")]
    pub web_url: String,
    #[serde(default = "default_web_max_articles")]
    pub web_max_articles: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub web_timeout_secs: u64,
    /// Pause after each scraped item.
    #[serde(default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for one adapter's whole `fetch`, retries included.
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            newsapi_api_key: None,
            query: default_query(),
            api_max_articles: default_api_max_articles(),
            newsapi_timeout_secs: default_http_timeout_secs(),
            csv_path: default_csv_path(),
            web_url: default_web_url(),
            web_max_articles: default_web_max_articles(),
            web_timeout_secs: default_http_timeout_secs(),
            politeness_delay_ms: default_politeness_delay_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            adapter_timeout_secs: default_adapter_timeout_secs(),
            output_path: default_output_path(),
        }
    }
}

impl IngestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    /// Parse a TOML file; fields not present keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading ingest config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing ingest config {}", path.display()))
    }

    /// Layered load:
    /// 1) $INGEST_CONFIG_PATH (must exist if set)
    /// 2) config/ingest.toml
    /// 3) built-in defaults
    ///
    /// then environment overrides on top.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(key) = env_nonempty("NEWSAPI_API_KEY") {
            self.newsapi_api_key = Some(key);
        }
        if let Some(v) = env_nonempty("NEWSAPI_TIMEOUT") {
            self.newsapi_timeout_secs = v
                .parse()
                .with_context(|| format!("NEWSAPI_TIMEOUT is not a number: {v}"))?;
        }
        if let Some(v) = env_nonempty("WEB_SCRAPER_TIMEOUT") {
            self.web_timeout_secs = v
                .parse()
                .with_context(|| format!("WEB_SCRAPER_TIMEOUT is not a number: {v}"))?;
        }
        if let Some(v) = env_nonempty("CSV_FILE_PATH") {
            self.csv_path = PathBuf::from(v);
        }
        if let Some(v) = env_nonempty("OUTPUT_FILE_PATH") {
            self.output_path = PathBuf::from(v);
        }
        Ok(())
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
