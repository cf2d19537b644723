// src/ingest/providers/web_page.rs
//! Headline scraper for a single news listing page.
//!
//! Candidates come from `h2[data-testid]`, falling back to the
//! `a.sc-4fedabbc-3` link cards when the page uses the older layout.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::ingest::config::IngestConfig;
use crate::ingest::error::FetchError;
use crate::ingest::providers::accept;
use crate::ingest::retry::{retry_transient, RetryPolicy};
use crate::ingest::types::{Record, SourceAdapter, SourceTag};

pub const DEFAULT_PAGE_URL: &str = "https://www.bbc.com/news/world/asia/india";
const BROWSER_UA: &str =
    "Mozilla/5.0 (Educational - Portfolio Project) AppleWebKit/537.36 (KHTML, like Gecko)";

fn selector(cell: &'static OnceCell<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector must parse"))
}

fn primary_selector() -> &'static Selector {
    static CELL: OnceCell<Selector> = OnceCell::new();
    selector(&CELL, "h2[data-testid]")
}

fn fallback_selector() -> &'static Selector {
    static CELL: OnceCell<Selector> = OnceCell::new();
    selector(&CELL, "a.sc-4fedabbc-3")
}

fn span_selector() -> &'static Selector {
    static CELL: OnceCell<Selector> = OnceCell::new();
    selector(&CELL, "span")
}

fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re.replace_all(s, " ").trim().to_string()
}

pub struct WebPageProvider {
    client: reqwest::Client,
    url: String,
    site_label: String,
    max_articles: usize,
    timeout: Duration,
    retry: RetryPolicy,
    item_delay: Duration,
}

impl WebPageProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            site_label: "BBC India".to_string(),
            max_articles: 5,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            item_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(cfg: &IngestConfig) -> Self {
        Self::new(cfg.web_url.clone())
            .with_max_articles(cfg.web_max_articles)
            .with_timeout(Duration::from_secs(cfg.web_timeout_secs))
            .with_retry(cfg.retry_policy())
            .with_item_delay(Duration::from_millis(cfg.politeness_delay_ms))
    }

    pub fn with_max_articles(mut self, max: usize) -> Self {
        self.max_articles = max;
        self
    }

    pub fn with_site_label(mut self, label: impl Into<String>) -> Self {
        self.site_label = label.into();
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

    /// Politeness pause per scraped item; zero disables it.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    async fn fetch_page(&self) -> Result<Vec<Record>, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_UA)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, "web"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status, "web"));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, "web body"))?;
        self.parse_page(&body)
    }

    /// Extract up to `max_articles` headlines from page markup.
    ///
    /// Markup with no candidate elements is a permanent failure; a re-download
    /// would get the same page.
    pub fn parse_page(&self, html: &str) -> Result<Vec<Record>, FetchError> {
        let t0 = Instant::now();
        if html.trim().is_empty() {
            return Err(FetchError::permanent("web: empty page"));
        }

        let doc = Html::parse_document(html);
        let limit = self.max_articles.saturating_mul(2);
        let mut candidates: Vec<ElementRef> = doc.select(primary_selector()).take(limit).collect();
        if candidates.is_empty() {
            candidates = doc.select(fallback_selector()).take(limit).collect();
        }
        if candidates.is_empty() {
            return Err(FetchError::permanent("web: no article elements found"));
        }

        let base = Url::parse(&self.url).ok();
        let mut out = Vec::new();
        for (idx, el) in candidates.into_iter().take(self.max_articles).enumerate() {
            let title_el = el.select(span_selector()).next().unwrap_or(el);
            let title = collapse_ws(&title_el.text().collect::<String>());
            if title.is_empty() {
                continue;
            }

            let link = el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "a")
                .unwrap_or(el);
            let href = link.value().attr("href").unwrap_or_default().trim();
            let url = resolve_href(base.as_ref(), href);

            let content = format!("News from {}: {}", self.site_label, title);
            accept(
                &mut out,
                SourceTag::Web,
                &format!("element {}", idx + 1),
                &title,
                &content,
                Some(&url),
            );
        }

        histogram!("ingest_parse_ms", "source" => "web").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

/// Absolute hrefs pass through; anything else is joined onto the page URL.
fn resolve_href(base: Option<&Url>, href: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    if let Ok(abs) = Url::parse(href) {
        return abs.into();
    }
    base.and_then(|b| b.join(href).ok())
        .map(String::from)
        .unwrap_or_else(|| href.to_string())
}

#[async_trait]
impl SourceAdapter for WebPageProvider {
    async fn fetch(&self) -> Result<Vec<Record>> {
        tracing::info!(target: "ingest", url = %self.url, max = self.max_articles, "scraping page");

        match retry_transient(self.retry, "web", || self.fetch_page()).await {
            Ok(records) => {
                if !self.item_delay.is_zero() {
                    let n = u32::try_from(records.len()).unwrap_or(u32::MAX);
                    tokio::time::sleep(self.item_delay.saturating_mul(n)).await;
                }
                tracing::info!(target: "ingest", count = records.len(), "got articles from web scraping");
                Ok(records)
            }
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, "web scraping failed");
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        "web"
    }
}
