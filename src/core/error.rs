use crate::download::error::DownloadError;
use thiserror::Error;

/// Centralized error type for the application.
///
/// All errors are converted into this enum for consistent handling.
/// Uses `thiserror` for automatic conversion and display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Download/yt-dlp errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected API responses and other irregular states
    #[error("{0}")]
    Other(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
