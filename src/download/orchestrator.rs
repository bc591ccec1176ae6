//! Download orchestration: the `CacheCheck -> {Cached | Fetching} ->
//! Uploading -> {Done | Failed}` state machine.
//!
//! Jobs are fire-and-forget: the update handler schedules one and returns
//! immediately; the job reports its outcome solely through UI edits. The
//! orchestrator has zero teloxide dependency. The Telegram boundary is
//! the `MediaSink` trait.

use crate::core::error::AppResult;
use crate::download::error::DownloadError;
use crate::download::fetcher::{AudioFetch, FetchedAudio};
use crate::resolver::{SongLookup, SongRecord};
use crate::storage::db::{get_connection, DbPool};
use crate::storage::cache::{self, StoreOutcome};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

/// Which message, for which user, reflects this job's outcome.
#[derive(Debug, Clone)]
pub enum UiTarget {
    /// Inline-result placeholder message.
    Inline { inline_message_id: String },
    /// Concrete chat message (the "Downloading…" status message).
    Chat { chat_id: i64, message_id: i32 },
}

/// One fetch operation. Ephemeral: created when a UI event needs an
/// uncached download, gone once the UI reaches a terminal state.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Cache key; also what the caption is re-resolved from.
    pub canonical_url: String,
    /// Platform-specific URL the fetcher consumes; `None` when no
    /// platform offers a downloadable source.
    pub source_url: Option<String>,
    pub target: UiTarget,
    pub requester_id: i64,
}

/// Messaging-platform boundary used by the orchestrator.
#[async_trait::async_trait]
pub trait MediaSink: Send + Sync {
    /// Cache-hit delivery: present an already-uploaded audio to the target.
    async fn deliver_cached(&self, job: &DownloadJob, file_id: &str, song: Option<&SongRecord>) -> AppResult<()>;

    /// Upload a freshly fetched local file; returns the platform's
    /// reusable asset handle.
    async fn upload(&self, job: &DownloadJob, audio: &FetchedAudio, song: Option<&SongRecord>) -> AppResult<String>;

    /// Flip the target to its success state around an uploaded handle.
    async fn finish(&self, job: &DownloadJob, file_id: &str, song: Option<&SongRecord>) -> AppResult<()>;

    /// Flip the target to its failure state with a diagnostic reason.
    async fn fail(&self, job: &DownloadJob, reason: &str) -> AppResult<()>;
}

/// Composes the cache, the fetcher, and the messaging sink.
///
/// Concurrency: all jobs run detached on the runtime, fetches bounded by
/// a fixed-size semaphore; jobs for the same canonical URL are serialized
/// through a per-key mutex so at most one fetch runs per URL. A job parked
/// on that mutex holds no semaphore permit.
pub struct DownloadOrchestrator<F, S, L> {
    db_pool: Arc<DbPool>,
    fetcher: Arc<F>,
    sink: Arc<S>,
    lookup: Arc<L>,
    permits: Arc<Semaphore>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl<F, S, L> DownloadOrchestrator<F, S, L>
where
    F: AudioFetch + 'static,
    S: MediaSink + 'static,
    L: SongLookup + 'static,
{
    pub fn new(db_pool: Arc<DbPool>, fetcher: Arc<F>, sink: Arc<S>, lookup: Arc<L>, max_concurrent: usize) -> Self {
        Self {
            db_pool,
            fetcher,
            sink,
            lookup,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            in_flight: DashMap::new(),
        }
    }

    /// Schedules a job and returns immediately.
    ///
    /// The handler's deadline is never tied to the download: the job runs
    /// to a terminal UI state (Done or Failed) on its own.
    pub fn begin(self: Arc<Self>, job: DownloadJob) {
        let this = self;
        tokio::spawn(async move {
            if let Err(e) = this.execute(&job).await {
                log::error!("Download job for {} ended with error: {}", job.canonical_url, e);
                // Last resort: the UI must not stay in a non-terminal state.
                if let Err(edit_err) = this.sink.fail(&job, "Internal error").await {
                    log::error!("Failed to report job failure to UI: {}", edit_err);
                }
            }
        });
    }

    /// Runs the full state machine for one job.
    ///
    /// Expected failures (no source, too long, tool errors) terminate via
    /// `sink.fail` and return `Ok`; only infrastructure errors propagate.
    pub async fn execute(&self, job: &DownloadJob) -> AppResult<()> {
        // CacheCheck
        if let Some(file_id) = self.cached_handle(&job.canonical_url)? {
            log::info!("Cache hit for {}", job.canonical_url);
            let song = self.lookup.resolve_by_url(&job.canonical_url).await;
            return self.sink.deliver_cached(job, &file_id, song.as_ref()).await;
        }

        let Some(source_url) = job.source_url.as_deref() else {
            return self.sink.fail(job, &DownloadError::NoSource.to_string()).await;
        };

        // Serialize jobs per canonical URL so a concurrent request for the
        // same uncached song waits instead of fetching twice. Gate waiters
        // hold no worker permit; the pool stays free for other URLs.
        let gate = self
            .in_flight
            .entry(job.canonical_url.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = gate.lock().await;

        // Double-check: the job we waited behind may have filled the cache.
        if let Some(file_id) = self.cached_handle(&job.canonical_url)? {
            log::info!("Cache filled while waiting for {}", job.canonical_url);
            drop(guard);
            self.release_gate(&job.canonical_url, gate);
            let song = self.lookup.resolve_by_url(&job.canonical_url).await;
            return self.sink.deliver_cached(job, &file_id, song.as_ref()).await;
        }

        let result = self.fetch_and_upload(job, source_url).await;

        drop(guard);
        self.release_gate(&job.canonical_url, gate);
        result
    }

    /// Fetching -> Uploading -> {Done | Failed}.
    async fn fetch_and_upload(&self, job: &DownloadJob, source_url: &str) -> AppResult<()> {
        log::info!("Fetching {} (source {})", job.canonical_url, source_url);

        // The worker-pool permit covers only the fetch itself.
        let fetched = {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                // The semaphore is only closed at shutdown.
                Err(_) => return Ok(()),
            };
            self.fetcher.fetch(source_url).await
        };

        let audio = match fetched {
            Ok(audio) => audio,
            Err(e) => {
                log::warn!("Fetch failed for {}: {}", job.canonical_url, e);
                return self.sink.fail(job, &e.to_string()).await;
            }
        };

        let song = self.lookup.resolve_by_url(&job.canonical_url).await;

        let uploaded = self.sink.upload(job, &audio, song.as_ref()).await;
        // The local temp file is removed no matter how the upload or the
        // cache store went; disk usage stays bounded.
        let file_id = match uploaded {
            Ok(file_id) => file_id,
            Err(e) => {
                remove_temp_file(&audio);
                log::warn!("Upload failed for {}: {}", job.canonical_url, e);
                return self.sink.fail(job, &format!("Failed to send audio: {}", e)).await;
            }
        };

        self.store_handle(&job.canonical_url, &file_id);
        remove_temp_file(&audio);

        self.sink.finish(job, &file_id, song.as_ref()).await
    }

    fn cached_handle(&self, canonical_url: &str) -> AppResult<Option<String>> {
        let conn = get_connection(&self.db_pool)?;
        Ok(cache::lookup(&conn, canonical_url)?)
    }

    /// Best-effort cache store: a failure only means the next request
    /// re-fetches.
    fn store_handle(&self, canonical_url: &str, file_id: &str) {
        match get_connection(&self.db_pool) {
            Ok(conn) => match cache::store(&conn, canonical_url, file_id) {
                Ok(StoreOutcome::Inserted) => {
                    log::info!("Cached file_id for {}", canonical_url);
                }
                Ok(StoreOutcome::AlreadyExists) => {
                    log::debug!("Lost cache-store race for {}", canonical_url);
                }
                Err(e) => {
                    log::warn!("Failed to store cache entry for {}: {}", canonical_url, e);
                }
            },
            Err(e) => {
                log::warn!("No DB connection for cache store of {}: {}", canonical_url, e);
            }
        }
    }

    /// Drops our clone of the per-key gate and removes the map entry once
    /// no other job holds it.
    fn release_gate(&self, canonical_url: &str, gate: Arc<Mutex<()>>) {
        drop(gate);
        self.in_flight
            .remove_if(canonical_url, |_, entry| Arc::strong_count(entry) == 1);
    }
}

fn remove_temp_file(audio: &FetchedAudio) {
    if let Err(e) = std::fs::remove_file(&audio.path) {
        log::warn!("Failed to remove temp file {}: {}", audio.path.display(), e);
    }
}
