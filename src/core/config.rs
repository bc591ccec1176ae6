use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: downloads.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "downloads.db".to_string()));

/// Local directory where fetched audio files land before upload
/// Read from CACHE_DIR environment variable, supports tilde (~) expansion
/// Default: downloads/cache
pub static CACHE_DIR: Lazy<String> = Lazy::new(|| {
    let raw = env::var("CACHE_DIR").unwrap_or_else(|_| "downloads/cache".to_string());
    shellexpand::tilde(&raw).to_string()
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: tunelink.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "tunelink.log".to_string()));

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Path to a Netscape cookies file passed to yt-dlp for authenticated sources
/// Read from YTDL_COOKIES_FILE environment variable, supports tilde (~) expansion
pub static YTDL_COOKIES_FILE: Lazy<Option<String>> = Lazy::new(|| {
    env::var("YTDL_COOKIES_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(|s| shellexpand::tilde(&s).to_string())
});

/// SOCKS proxy endpoint forwarded to yt-dlp (e.g. socks5://127.0.0.1:1080)
/// Read from PROXY_URL environment variable; empty disables the proxy
pub static PROXY_URL: Lazy<Option<String>> = Lazy::new(|| {
    env::var("PROXY_URL")
        .ok()
        .and_then(|s| if s.trim().is_empty() { None } else { Some(s) })
});

/// file_id of the placeholder audio shown while an inline download is in flight
/// Read from LOADING_AUDIO_ID environment variable
pub static LOADING_AUDIO_ID: Lazy<String> =
    Lazy::new(|| env::var("LOADING_AUDIO_ID").unwrap_or_else(|_| String::new()));

/// Spotify client-credentials pair for catalog search
/// Read from SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET environment variables
pub static SPOTIFY_CLIENT_ID: Lazy<String> =
    Lazy::new(|| env::var("SPOTIFY_CLIENT_ID").unwrap_or_else(|_| String::new()));
pub static SPOTIFY_CLIENT_SECRET: Lazy<String> =
    Lazy::new(|| env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_else(|_| String::new()));

/// Download configuration
pub mod download {
    use super::Duration;

    /// Hard ceiling on track duration; longer sources are rejected before download
    pub const MAX_DURATION_SECS: u32 = 600;

    /// Timeout for yt-dlp commands (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }
}

/// Worker pool configuration
pub mod queue {
    /// Maximum number of concurrent fetch-and-transcode jobs
    pub const MAX_CONCURRENT_DOWNLOADS: usize = 4;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for resolver HTTP calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 8;

    /// Request timeout for Telegram API calls, sized for audio uploads (in seconds)
    pub const TELEGRAM_TIMEOUT_SECS: u64 = 300;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    pub fn telegram_timeout() -> Duration {
        Duration::from_secs(TELEGRAM_TIMEOUT_SECS)
    }
}

/// Catalog search configuration
pub mod search {
    /// Result limit for inline free-text search
    pub const INLINE_RESULT_LIMIT: u32 = 3;
}
