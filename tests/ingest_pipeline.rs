// tests/ingest_pipeline.rs
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use multi_source_ingestion::ingest::collect;
use multi_source_ingestion::ingest::persist::MemorySink;
use multi_source_ingestion::{
    normalize, run_once, JsonFileSink, PersistError, Record, RecordSink, SourceAdapter,
    SourceSlots, SourceTag,
};
use serde_json::Value;

enum Behaviour {
    Yield(Vec<Record>),
    Fail,
    Panic,
    Hang,
    /// Sleep first, then yield.
    Slow(Duration, Vec<Record>),
}

struct MockAdapter(Behaviour);

#[async_trait]
impl SourceAdapter for MockAdapter {
    async fn fetch(&self) -> Result<Vec<Record>> {
        match &self.0 {
            Behaviour::Yield(v) => Ok(v.clone()),
            Behaviour::Fail => Err(anyhow!("API Error")),
            Behaviour::Panic => panic!("adapter blew up"),
            Behaviour::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Behaviour::Slow(d, v) => {
                tokio::time::sleep(*d).await;
                Ok(v.clone())
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn recs(source: &str, titles: &[&str]) -> Vec<Record> {
    titles
        .iter()
        .map(|t| normalize(t, "Content", source, Some("https://x.test")).unwrap())
        .collect()
}

fn titles(out: &[Record]) -> Vec<&str> {
    out.iter().map(|r| r.title()).collect()
}

const LIMIT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn all_sources_in_fixed_order() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Yield(recs("api", &["NewsAPI Article"]))))
        .with_file(MockAdapter(Behaviour::Yield(recs("file", &["CSV Article"]))))
        .with_web(MockAdapter(Behaviour::Yield(recs("web", &["Web Article"]))));

    let out = run_once(slots, &sink, LIMIT).await.unwrap();

    let sources: Vec<SourceTag> = out.iter().map(|r| r.source()).collect();
    assert_eq!(sources, vec![SourceTag::Api, SourceTag::File, SourceTag::Web]);
    let calls = sink.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], out);
}

#[tokio::test]
async fn failing_source_is_isolated() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Fail))
        .with_file(MockAdapter(Behaviour::Yield(recs("file", &["f1", "f2"]))))
        .with_web(MockAdapter(Behaviour::Yield(recs("web", &["w1", "w2", "w3"]))));

    let out = run_once(slots, &sink, LIMIT).await.unwrap();

    assert_eq!(out.len(), 2 + 3);
    assert_eq!(titles(&out), vec!["f1", "f2", "w1", "w2", "w3"]);
    assert_eq!(sink.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn panicking_source_is_isolated() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Yield(recs("api", &["a"]))))
        .with_file(MockAdapter(Behaviour::Panic))
        .with_web(MockAdapter(Behaviour::Fail));

    let out = run_once(slots, &sink, LIMIT).await.unwrap();
    assert_eq!(titles(&out), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn hanging_source_times_out() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Hang))
        .with_file(MockAdapter(Behaviour::Yield(recs("file", &["f"]))));

    let started = tokio::time::Instant::now();
    let out = run_once(slots, &sink, Duration::from_secs(5)).await.unwrap();
    assert_eq!(titles(&out), vec!["f"]);
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn completion_order_does_not_leak_into_output() {
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Slow(
            Duration::from_secs(3),
            recs("api", &["slow api"]),
        )))
        .with_file(MockAdapter(Behaviour::Slow(
            Duration::from_secs(2),
            recs("file", &["mid file"]),
        )))
        .with_web(MockAdapter(Behaviour::Yield(recs("web", &["fast web"]))));

    let started = tokio::time::Instant::now();
    let out = collect(slots, LIMIT).await;
    assert_eq!(titles(&out), vec!["slow api", "mid file", "fast web"]);
    // sources run side by side, so the run takes as long as the slowest one
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test]
async fn all_sources_empty_skips_persistence() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Yield(vec![])))
        .with_file(MockAdapter(Behaviour::Fail))
        .with_web(MockAdapter(Behaviour::Panic));

    let out = run_once(slots, &sink, LIMIT).await.unwrap();
    assert!(out.is_empty());
    assert!(sink.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_slot_contributes_nothing() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default().with_web(MockAdapter(Behaviour::Yield(recs("web", &["w"]))));
    let out = run_once(slots, &sink, LIMIT).await.unwrap();
    assert_eq!(titles(&out), vec!["w"]);
}

#[tokio::test]
async fn duplicates_across_sources_are_kept() {
    let sink = MemorySink::new();
    let slots = SourceSlots::default()
        .with_api(MockAdapter(Behaviour::Yield(recs("api", &["Same"]))))
        .with_web(MockAdapter(Behaviour::Yield(recs("web", &["Same"]))));
    let out = run_once(slots, &sink, LIMIT).await.unwrap();
    assert_eq!(titles(&out), vec!["Same", "Same"]);
}

struct BrokenSink {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl RecordSink for BrokenSink {
    async fn store(&self, _records: &[Record]) -> Result<(), PersistError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistError::Write {
            path: "/dev/full".into(),
            source: std::io::Error::other("disk full"),
        })
    }

    fn describe(&self) -> String {
        "broken".into()
    }
}

#[tokio::test]
async fn persistence_failure_reaches_the_caller() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let sink = BrokenSink {
        attempts: attempts.clone(),
    };
    let slots = SourceSlots::default().with_file(MockAdapter(Behaviour::Yield(recs("file", &["f"]))));

    let err = run_once(slots, &sink, LIMIT).await.unwrap_err();
    assert!(matches!(err, PersistError::Write { .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

/// Flips `released` when dropped, standing in for a socket or file handle.
struct Guard(Arc<AtomicBool>);

impl Drop for Guard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct HoldsResource {
    entered: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl SourceAdapter for HoldsResource {
    async fn fetch(&self) -> Result<Vec<Record>> {
        let _guard = Guard(self.released.clone());
        self.entered.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        unreachable!()
    }

    fn name(&self) -> &'static str {
        "holds-resource"
    }
}

#[tokio::test]
async fn cancelled_collect_releases_in_flight_adapters() {
    let entered = Arc::new(AtomicBool::new(false));
    let released = Arc::new(AtomicBool::new(false));
    let slots = SourceSlots::default()
        .with_api(HoldsResource {
            entered: entered.clone(),
            released: released.clone(),
        })
        .with_file(MockAdapter(Behaviour::Yield(recs("file", &["f"]))));

    let cancelled = tokio::time::timeout(Duration::from_millis(50), collect(slots, LIMIT)).await;
    assert!(cancelled.is_err(), "collect should still be waiting on the api slot");
    assert!(entered.load(Ordering::SeqCst));

    // aborted tasks are torn down on the runtime's next pass
    for _ in 0..100 {
        if released.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(released.load(Ordering::SeqCst), "adapter resource still held");
}

#[tokio::test]
async fn dropped_store_leaves_old_or_complete_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("articles.json");
    std::fs::write(&dest, "[\"stale\"]").unwrap();

    let records = recs("file", &["fresh 1", "fresh 2"]);
    let sink = JsonFileSink::new(dest.clone());
    // polled once, then dropped before the write finishes
    let _ = tokio::time::timeout(Duration::ZERO, sink.store(&records)).await;

    let is_old = |v: &Value| v == &serde_json::json!(["stale"]);
    let is_new = |v: &Value| {
        v.as_array().is_some_and(|a| {
            a.len() == 2 && a[0]["title"] == "fresh 1" && a[1]["title"] == "fresh 2"
        })
    };

    let mut finished = false;
    for _ in 0..200 {
        let text = std::fs::read_to_string(&dest).expect("destination always present");
        let v: Value = serde_json::from_str(&text).expect("never a partial document");
        assert!(is_old(&v) || is_new(&v), "unexpected content: {text}");
        if is_new(&v) {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(finished, "write started before the drop should still complete");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["articles.json".to_string()]);
}
