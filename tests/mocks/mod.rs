//! Hand-rolled mocks for exercising the download orchestrator without
//! network, Telegram, or yt-dlp.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

use tunelink::core::{AppError, AppResult};
use tunelink::download::error::DownloadError;
use tunelink::download::fetcher::{AudioFetch, FetchedAudio};
use tunelink::download::orchestrator::{DownloadJob, MediaSink};
use tunelink::resolver::{ContentType, Platform, SongLookup, SongRecord};

/// What the mock fetcher should do when asked to fetch.
pub enum FetchPlan {
    /// Produce a real temp file, optionally after a delay.
    Succeed { delay_ms: u64 },
    TooLong(u32),
    Fail(String),
}

/// Counting fetcher that writes real files so the orchestrator's temp-file
/// cleanup is exercised. Fetch start/end events are recorded in order so
/// tests can assert on interleaving.
pub struct MockFetcher {
    plan: FetchPlan,
    dir: TempDir,
    pub calls: AtomicUsize,
    pub events: Mutex<Vec<(String, &'static str)>>,
}

impl MockFetcher {
    pub fn new(plan: FetchPlan) -> Self {
        Self {
            plan,
            dir: tempfile::tempdir().expect("tempdir"),
            calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dir_path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// `(source_url, "start" | "end")` pairs in the order they happened.
    pub fn events(&self) -> Vec<(String, &'static str)> {
        self.events.lock().expect("events lock").clone()
    }
}

#[async_trait]
impl AudioFetch for MockFetcher {
    async fn fetch(&self, source_url: &str) -> Result<FetchedAudio, DownloadError> {
        self.events
            .lock()
            .expect("events lock")
            .push((source_url.to_string(), "start"));
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.plan {
            FetchPlan::Succeed { delay_ms } => {
                if *delay_ms > 0 {
                    sleep(Duration::from_millis(*delay_ms)).await;
                }
                let path = self.dir.path().join(format!("mock-{}.mp3", call));
                std::fs::write(&path, b"mp3").expect("write mock audio");
                Ok(FetchedAudio {
                    path,
                    duration_secs: 212,
                    performer: "Mock Artist".to_string(),
                    title: "Mock Track".to_string(),
                    thumbnail_url: None,
                })
            }
            FetchPlan::TooLong(secs) => Err(DownloadError::TooLong(*secs)),
            FetchPlan::Fail(reason) => Err(DownloadError::YtDlp(reason.clone())),
        };
        self.events
            .lock()
            .expect("events lock")
            .push((source_url.to_string(), "end"));
        result
    }
}

/// Recording sink: counts every terminal transition and captures failure
/// reasons.
#[derive(Default)]
pub struct MockSink {
    pub cached_deliveries: AtomicUsize,
    pub uploads: AtomicUsize,
    pub finishes: AtomicUsize,
    pub fail_upload: AtomicBool,
    pub failures: Mutex<Vec<String>>,
    pub uploaded_paths: Mutex<Vec<PathBuf>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upload() -> Self {
        let sink = Self::default();
        sink.fail_upload.store(true, Ordering::SeqCst);
        sink
    }

    pub fn failure_reasons(&self) -> Vec<String> {
        self.failures.lock().expect("failures lock").clone()
    }
}

#[async_trait]
impl MediaSink for MockSink {
    async fn deliver_cached(&self, _job: &DownloadJob, _file_id: &str, _song: Option<&SongRecord>) -> AppResult<()> {
        self.cached_deliveries.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload(&self, _job: &DownloadJob, audio: &FetchedAudio, _song: Option<&SongRecord>) -> AppResult<String> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(AppError::Other("telegram rejected the upload".to_string()));
        }
        self.uploaded_paths.lock().expect("paths lock").push(audio.path.clone());
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("file-{}", n))
    }

    async fn finish(&self, _job: &DownloadJob, _file_id: &str, _song: Option<&SongRecord>) -> AppResult<()> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fail(&self, _job: &DownloadJob, reason: &str) -> AppResult<()> {
        self.failures.lock().expect("failures lock").push(reason.to_string());
        Ok(())
    }
}

/// Lookup that always returns the same record (or nothing).
pub struct MockLookup {
    record: Option<SongRecord>,
}

impl MockLookup {
    pub fn with_song() -> Self {
        Self {
            record: Some(sample_song()),
        }
    }

    pub fn empty() -> Self {
        Self { record: None }
    }
}

#[async_trait]
impl SongLookup for MockLookup {
    async fn resolve_by_url(&self, _url: &str) -> Option<SongRecord> {
        self.record.clone()
    }
}

pub fn sample_song() -> SongRecord {
    SongRecord {
        canonical_url: "https://song.link/s/abc".to_string(),
        title: "Mock Track".to_string(),
        artist_name: "Mock Artist".to_string(),
        thumbnail_url: Some("https://t/x.jpg".to_string()),
        content_type: ContentType::Track,
        platform_urls: vec![
            (Platform::All, "https://song.link/s/abc".to_string()),
            (Platform::YtMusic, "https://music.youtube.com/watch?v=abc".to_string()),
        ],
    }
}
