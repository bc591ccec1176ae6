//! Tunelink - Telegram bot for sharing and downloading music via song.link
//!
//! Resolves music URLs to canonical cross-platform records through the
//! Odesli API, searches the Spotify catalog for free-text queries, and
//! fetches/caches track audio with yt-dlp so each song is downloaded at
//! most once.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, and logging
//! - `resolver`: Odesli URL resolution and Spotify search
//! - `storage`: SQLite pool, the file-id cache, and usage stats
//! - `download`: yt-dlp fetcher and the download orchestrator
//! - `telegram`: Bot integration and handlers

pub mod core;
pub mod download;
pub mod resolver;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, init_logger, AppError, AppResult};
pub use download::{DownloadJob, DownloadOrchestrator, MediaSink, UiTarget};
pub use resolver::{SongLookup, SongRecord, SongResolver};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
