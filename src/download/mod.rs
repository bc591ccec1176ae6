//! Download pipeline: error taxonomy, yt-dlp fetcher, and the
//! orchestrator that ties cache, fetcher, and Telegram together.

pub mod error;
pub mod fetcher;
pub mod orchestrator;

pub use error::DownloadError;
pub use fetcher::{AudioFetch, FetchedAudio, YtDlpFetcher};
pub use orchestrator::{DownloadJob, DownloadOrchestrator, MediaSink, UiTarget};
