// tests/providers_news_api.rs
mod common;

use std::time::Duration;

use axum::http::StatusCode;
use multi_source_ingestion::ingest::providers::news_api::{parse_response, NewsApiProvider};
use multi_source_ingestion::{RetryPolicy, SourceAdapter, SourceTag};

const OK_BODY: &str = include_str!("fixtures/newsapi_ok.json");

fn provider(base: &str) -> NewsApiProvider {
    NewsApiProvider::new(Some("test-key".into()))
        .unwrap()
        .with_base_url(format!("{base}/v2/everything"))
        .with_query("India", 5)
        .with_timeout(Duration::from_millis(300))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)))
}

#[test]
fn fixture_parses_and_skips_invalid_items() {
    let recs = parse_response(OK_BODY).expect("ok body");
    assert_eq!(recs.len(), 3);
    assert!(recs.iter().all(|r| r.source() == SourceTag::Api));

    assert_eq!(recs[0].title(), "Monsoon arrives early in Kerala");
    assert!(recs[0].content().starts_with("The India Meteorological Department"));
    assert_eq!(recs[1].content(), "Benchmark indices ended the session up 0.8%.");
    assert_eq!(recs[2].content(), "No content available");
    assert_eq!(recs[2].url(), "N/A");
}

#[test]
fn malformed_json_is_permanent() {
    let err = parse_response("<html>").unwrap_err();
    assert!(!err.is_transient());
}

#[tokio::test]
async fn recovers_after_server_errors() {
    let (base, hits) = common::scripted(
        "/v2/everything",
        vec![
            (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            (StatusCode::TOO_MANY_REQUESTS, String::new()),
            (StatusCode::OK, OK_BODY.to_string()),
        ],
    )
    .await;

    let recs = provider(&base).fetch().await.unwrap();
    assert_eq!(recs.len(), 3);
    assert_eq!(common::hits(&hits), 3);
}

#[tokio::test]
async fn persistent_server_errors_give_up_after_max_attempts() {
    let (base, hits) = common::scripted(
        "/v2/everything",
        vec![(StatusCode::SERVICE_UNAVAILABLE, String::new())],
    )
    .await;

    let recs = provider(&base).fetch().await.unwrap();
    assert!(recs.is_empty());
    assert_eq!(common::hits(&hits), 3);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let (base, hits) = common::scripted(
        "/v2/everything",
        vec![(
            StatusCode::UNAUTHORIZED,
            r#"{"status":"error","code":"apiKeyInvalid"}"#.to_string(),
        )],
    )
    .await;

    let recs = provider(&base).fetch().await.unwrap();
    assert!(recs.is_empty());
    assert_eq!(common::hits(&hits), 1);
}

#[tokio::test]
async fn api_level_error_is_not_retried() {
    let (base, hits) = common::scripted(
        "/v2/everything",
        vec![(
            StatusCode::OK,
            r#"{"status":"error","message":"quota"}"#.to_string(),
        )],
    )
    .await;

    let recs = provider(&base).fetch().await.unwrap();
    assert!(recs.is_empty());
    assert_eq!(common::hits(&hits), 1);
}

#[tokio::test]
async fn timeouts_are_retried_then_abandoned() {
    let (base, hits) = common::stalling("/v2/everything", Duration::from_secs(5)).await;

    let recs = provider(&base)
        .with_timeout(Duration::from_millis(100))
        .fetch()
        .await
        .unwrap();
    assert!(recs.is_empty());
    assert_eq!(common::hits(&hits), 3);
}

#[tokio::test]
async fn connection_refused_is_transient_and_swallowed() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let recs = provider(&format!("http://127.0.0.1:{port}"))
        .fetch()
        .await
        .unwrap();
    assert!(recs.is_empty());
}
