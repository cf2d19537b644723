// tests/common/mod.rs
// Throw-away HTTP servers for exercising the real request paths.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::{routing::get, Router};

/// Bind on an ephemeral port and serve `app` in the background.
/// Returns the base URL, e.g. `http://127.0.0.1:41234`.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

/// Serve `path` with a scripted sequence of responses. The last entry repeats
/// once the script runs out. Returns (base url, hit counter).
pub async fn scripted(
    path: &str,
    script: Vec<(StatusCode, String)>,
) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let script = Arc::new(script);
    let counter = hits.clone();
    let app = Router::new().route(
        path,
        get(move || {
            let counter = counter.clone();
            let script = script.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let ix = n.min(script.len().saturating_sub(1));
                script[ix].clone()
            }
        }),
    );
    (serve(app).await, hits)
}

/// Serve `path` with a handler that stalls for `stall` before answering.
pub async fn stalling(path: &str, stall: Duration) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        path,
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(stall).await;
                (StatusCode::OK, String::from("{}"))
            }
        }),
    );
    (serve(app).await, hits)
}

pub fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
