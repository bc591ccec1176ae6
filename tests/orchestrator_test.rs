//! Integration tests for the download orchestrator state machine.
//!
//! Every test drives the real orchestrator against mock fetcher/sink/lookup
//! implementations and an in-memory SQLite cache.

mod mocks;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use mocks::{FetchPlan, MockFetcher, MockLookup, MockSink};
use pretty_assertions::assert_eq;
use tunelink::download::orchestrator::{DownloadJob, DownloadOrchestrator, UiTarget};
use tunelink::storage::cache;
use tunelink::storage::db::{create_memory_pool, get_connection, DbPool};

const URL: &str = "https://song.link/s/abc";
const SOURCE: &str = "https://music.youtube.com/watch?v=abc";

fn pool() -> Arc<DbPool> {
    Arc::new(create_memory_pool().expect("pool"))
}

fn job() -> DownloadJob {
    DownloadJob {
        canonical_url: URL.to_string(),
        source_url: Some(SOURCE.to_string()),
        target: UiTarget::Chat {
            chat_id: 7,
            message_id: 42,
        },
        requester_id: 7,
    }
}

fn orchestrator(
    db_pool: Arc<DbPool>,
    fetcher: Arc<MockFetcher>,
    sink: Arc<MockSink>,
) -> Arc<DownloadOrchestrator<MockFetcher, MockSink, MockLookup>> {
    Arc::new(DownloadOrchestrator::new(
        db_pool,
        fetcher,
        sink,
        Arc::new(MockLookup::with_song()),
        4,
    ))
}

fn cached_file_id(db_pool: &DbPool, url: &str) -> Option<String> {
    let conn = get_connection(db_pool).expect("conn");
    cache::lookup(&conn, url).expect("lookup")
}

#[tokio::test]
async fn cache_hit_short_circuits_the_fetcher() {
    let db_pool = pool();
    {
        let conn = get_connection(&db_pool).expect("conn");
        cache::store(&conn, URL, "file-cached").expect("seed");
    }

    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 0 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(db_pool, Arc::clone(&fetcher), Arc::clone(&sink));

    orch.execute(&job()).await.expect("execute");

    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(sink.cached_deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(sink.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cache_miss_fetches_uploads_and_stores() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 0 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(Arc::clone(&db_pool), Arc::clone(&fetcher), Arc::clone(&sink));

    orch.execute(&job()).await.expect("execute");

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(sink.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(sink.finishes.load(Ordering::SeqCst), 1);
    assert_eq!(cached_file_id(&db_pool, URL), Some("file-0".to_string()));

    // Temp file is gone once the job completes.
    let uploaded = sink.uploaded_paths.lock().expect("paths").clone();
    assert_eq!(uploaded.len(), 1);
    assert!(!uploaded[0].exists());
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 0 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(db_pool, Arc::clone(&fetcher), Arc::clone(&sink));

    orch.execute(&job()).await.expect("first");
    orch.execute(&job()).await.expect("second");

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(sink.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(sink.cached_deliveries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_source_fails_without_fetching() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 0 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(Arc::clone(&db_pool), Arc::clone(&fetcher), Arc::clone(&sink));

    let mut sourceless = job();
    sourceless.source_url = None;
    orch.execute(&sourceless).await.expect("execute");

    assert_eq!(fetcher.call_count(), 0);
    let reasons = sink.failure_reasons();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("No downloadable source"));
    assert_eq!(cached_file_id(&db_pool, URL), None);
}

#[tokio::test]
async fn too_long_track_is_rejected_before_download() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::TooLong(901)));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(Arc::clone(&db_pool), fetcher, Arc::clone(&sink));

    orch.execute(&job()).await.expect("execute");

    let reasons = sink.failure_reasons();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("too long"));
    assert!(reasons[0].contains("901"));
    assert_eq!(sink.uploads.load(Ordering::SeqCst), 0);
    assert_eq!(cached_file_id(&db_pool, URL), None);
}

#[tokio::test]
async fn tool_failure_reaches_the_ui_as_failed() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Fail("ERROR: video unavailable".to_string())));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(db_pool, fetcher, Arc::clone(&sink));

    orch.execute(&job()).await.expect("execute");

    let reasons = sink.failure_reasons();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("video unavailable"));
    assert_eq!(sink.finishes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_failure_fails_the_job_and_removes_the_file() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 0 }));
    let sink = Arc::new(MockSink::failing_upload());
    let orch = orchestrator(Arc::clone(&db_pool), Arc::clone(&fetcher), Arc::clone(&sink));

    orch.execute(&job()).await.expect("execute");

    let reasons = sink.failure_reasons();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("Failed to send audio"));
    assert_eq!(cached_file_id(&db_pool, URL), None);

    // No fetched file survives the failed upload.
    let leftovers: Vec<_> = std::fs::read_dir(fetcher.dir_path())
        .expect("read dir")
        .filter_map(|e| e.ok())
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn concurrent_jobs_for_one_url_fetch_once() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 50 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(Arc::clone(&db_pool), Arc::clone(&fetcher), Arc::clone(&sink));

    let first = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.execute(&job()).await })
    };
    let second = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.execute(&job()).await })
    };
    first.await.expect("join").expect("first");
    second.await.expect("join").expect("second");

    // One fetch and upload; the loser of the race is served from cache.
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(sink.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(sink.cached_deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(sink.finishes.load(Ordering::SeqCst), 1);
    assert_eq!(cached_file_id(&db_pool, URL), Some("file-0".to_string()));
}

#[tokio::test]
async fn waiting_duplicates_do_not_starve_the_worker_pool() {
    const OTHER_URL: &str = "https://song.link/s/other";
    const OTHER_SOURCE: &str = "https://music.youtube.com/watch?v=other";

    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 100 }));
    let sink = Arc::new(MockSink::new());
    let orch = Arc::new(DownloadOrchestrator::new(
        db_pool,
        Arc::clone(&fetcher),
        Arc::clone(&sink),
        Arc::new(MockLookup::with_song()),
        2,
    ));

    // Three duplicates: one fetches, two park on the per-URL gate. With a
    // pool of two, the parked jobs must not eat the remaining permit.
    let mut jobs = Vec::new();
    for _ in 0..3 {
        let orch = Arc::clone(&orch);
        jobs.push(tokio::spawn(async move { orch.execute(&job()).await }));
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let mut other = job();
    other.canonical_url = OTHER_URL.to_string();
    other.source_url = Some(OTHER_SOURCE.to_string());
    {
        let orch = Arc::clone(&orch);
        jobs.push(tokio::spawn(async move { orch.execute(&other).await }));
    }

    for handle in jobs {
        handle.await.expect("join").expect("execute");
    }

    // The unrelated fetch started while the duplicate fetch was still
    // running instead of waiting behind the parked jobs.
    let events = fetcher.events();
    let other_start = events
        .iter()
        .position(|(url, event)| url == OTHER_SOURCE && *event == "start")
        .expect("other fetch started");
    let first_end = events
        .iter()
        .position(|(url, event)| url == SOURCE && *event == "end")
        .expect("first fetch ended");
    assert!(other_start < first_end);
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(sink.cached_deliveries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn distinct_urls_are_fetched_independently() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 0 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(Arc::clone(&db_pool), Arc::clone(&fetcher), Arc::clone(&sink));

    let mut other = job();
    other.canonical_url = "https://song.link/s/xyz".to_string();
    orch.execute(&job()).await.expect("first url");
    orch.execute(&other).await.expect("second url");

    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(cached_file_id(&db_pool, URL), Some("file-0".to_string()));
    assert_eq!(
        cached_file_id(&db_pool, "https://song.link/s/xyz"),
        Some("file-1".to_string())
    );
}

#[tokio::test]
async fn begin_is_fire_and_forget() {
    let db_pool = pool();
    let fetcher = Arc::new(MockFetcher::new(FetchPlan::Succeed { delay_ms: 20 }));
    let sink = Arc::new(MockSink::new());
    let orch = orchestrator(Arc::clone(&db_pool), fetcher, Arc::clone(&sink));

    // Returns immediately; the job completes on its own.
    Arc::clone(&orch).begin(job());

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while cached_file_id(&db_pool, URL).is_none() {
        assert!(std::time::Instant::now() < deadline, "job never completed");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sink.finishes.load(Ordering::SeqCst), 1);
}
