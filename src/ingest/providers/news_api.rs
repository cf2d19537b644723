// src/ingest/providers/news_api.rs
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;

use crate::ingest::config::IngestConfig;
use crate::ingest::error::FetchError;
use crate::ingest::providers::accept;
use crate::ingest::retry::{retry_transient, RetryPolicy};
use crate::ingest::types::{Record, SourceAdapter, SourceTag};

pub const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
const NO_CONTENT: &str = "No content available";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
struct ApiArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
}

/// NewsAPI `everything` endpoint.
pub struct NewsApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    query: String,
    page_size: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl NewsApiProvider {
    /// Fails permanently without a key; there is nothing to retry.
    pub fn new(api_key: Option<String>) -> Result<Self, FetchError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FetchError::permanent("NEWSAPI_API_KEY not set"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: NEWSAPI_URL.to_string(),
            api_key,
            query: "India".to_string(),
            page_size: 10,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(cfg: &IngestConfig) -> Result<Self, FetchError> {
        Ok(Self::new(cfg.newsapi_api_key.clone())?
            .with_query(&cfg.query, cfg.api_max_articles)
            .with_timeout(Duration::from_secs(cfg.newsapi_timeout_secs))
            .with_retry(cfg.retry_policy()))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_query(mut self, query: &str, page_size: usize) -> Self {
        self.query = query.to_string();
        self.page_size = page_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_page(&self) -> Result<Vec<Record>, FetchError> {
        let page_size = self.page_size.to_string();
        let params = [
            ("q", self.query.as_str()),
            ("language", "en"),
            ("sortBy", "publishedAt"),
            ("pageSize", page_size.as_str()),
            ("apiKey", self.api_key.as_str()),
        ];

        let resp = self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, "newsapi"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status, "newsapi"));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, "newsapi body"))?;
        parse_response(&body)
    }
}

/// Parse a NewsAPI JSON body into records. Items that fail validation are
/// skipped; a non-`ok` status or malformed JSON fails the whole page.
pub fn parse_response(body: &str) -> Result<Vec<Record>, FetchError> {
    let t0 = Instant::now();
    let data: ApiResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::permanent(format!("newsapi: malformed response: {e}")))?;

    if data.status != "ok" {
        return Err(FetchError::permanent(format!(
            "newsapi: API error: {}",
            data.message.as_deref().unwrap_or("Unknown error")
        )));
    }

    let mut out = Vec::with_capacity(data.articles.len());
    for (idx, it) in data.articles.into_iter().enumerate() {
        let title = decode(it.title.as_deref().unwrap_or_default());
        // Full content sits behind the paywall, so the description comes first.
        let content = [it.description.as_deref(), it.content.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .map(decode)
            .unwrap_or_else(|| NO_CONTENT.to_string());

        accept(
            &mut out,
            SourceTag::Api,
            &format!("article {}", idx + 1),
            &title,
            &content,
            it.url.as_deref(),
        );
    }

    histogram!("ingest_parse_ms", "source" => "api").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).to_string()
}

#[async_trait]
impl SourceAdapter for NewsApiProvider {
    async fn fetch(&self) -> Result<Vec<Record>> {
        tracing::info!(
            target: "ingest",
            provider = self.name(),
            query = %self.query,
            max = self.page_size,
            "fetching from news API"
        );

        match retry_transient(self.retry, "newsapi", || self.fetch_page()).await {
            Ok(records) => {
                tracing::info!(target: "ingest", count = records.len(), "got articles from news API");
                Ok(records)
            }
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, "news API fetching failed");
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
