//! Audio fetcher: yt-dlp metadata probe, duration guard, and
//! download-with-transcode to mp3.

use crate::core::config;
use crate::download::error::DownloadError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// A successfully fetched local audio file plus the metadata the upload
/// needs.
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub path: PathBuf,
    pub duration_secs: u32,
    pub performer: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

/// Fetch seam consumed by the orchestrator; the real implementation shells
/// out to yt-dlp, tests substitute a mock.
#[async_trait]
pub trait AudioFetch: Send + Sync {
    async fn fetch(&self, source_url: &str) -> Result<FetchedAudio, DownloadError>;
}

/// Metadata-only probe output (`--dump-json --skip-download`).
#[derive(Debug, Deserialize)]
struct ProbeInfo {
    id: String,
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

/// yt-dlp backed fetcher. One instance is shared by all workers; the
/// cache directory is shared too, with filenames derived from the
/// source's own id so distinct URLs never collide.
pub struct YtDlpFetcher {
    bin: String,
    cache_dir: PathBuf,
    cookies_file: Option<String>,
    proxy: Option<String>,
    max_duration_secs: u32,
}

impl YtDlpFetcher {
    pub fn from_env() -> Self {
        Self {
            bin: config::YTDL_BIN.clone(),
            cache_dir: PathBuf::from(&*config::CACHE_DIR),
            cookies_file: config::YTDL_COOKIES_FILE.clone(),
            proxy: config::PROXY_URL.clone(),
            max_duration_secs: config::download::MAX_DURATION_SECS,
        }
    }

    /// Common flags shared by the probe and the download invocation.
    fn push_common_args(&self, args: &mut Vec<String>) {
        args.push("--no-playlist".to_string());
        args.push("--quiet".to_string());
        if let Some(cookies) = &self.cookies_file {
            if Path::new(cookies).exists() {
                args.push("--cookies".to_string());
                args.push(cookies.clone());
            } else {
                log::warn!("Cookies file not found, continuing without it: {}", cookies);
            }
        }
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
    }

    async fn run_ytdlp(&self, args: &[String]) -> Result<std::process::Output, DownloadError> {
        log::debug!("yt-dlp command: {} {}", self.bin, args.join(" "));

        timeout(
            config::download::ytdlp_timeout(),
            TokioCommand::new(&self.bin).args(args).output(),
        )
        .await
        .map_err(|_| DownloadError::Timeout)?
        .map_err(|e| DownloadError::YtDlp(format!("Failed to execute {}: {}", self.bin, e)))
    }

    /// Metadata-only probe: no download, just the source's own JSON.
    async fn probe(&self, source_url: &str) -> Result<ProbeInfo, DownloadError> {
        let mut args = vec!["--dump-json".to_string(), "--skip-download".to_string()];
        self.push_common_args(&mut args);
        args.push(source_url.to_string());

        let output = self.run_ytdlp(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::YtDlp(truncate_diagnostic(&stderr)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::YtDlp(format!("Failed to parse yt-dlp metadata: {}", e)))
    }

    async fn download(&self, source_url: &str) -> Result<(), DownloadError> {
        let output_template = self.cache_dir.join("%(id)s.%(ext)s");
        let mut args = vec![
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
            "--format".to_string(),
            "bestaudio".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
        ];
        self.push_common_args(&mut args);
        args.push(source_url.to_string());

        let output = self.run_ytdlp(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::YtDlp(truncate_diagnostic(&stderr)));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioFetch for YtDlpFetcher {
    async fn fetch(&self, source_url: &str) -> Result<FetchedAudio, DownloadError> {
        let info = self.probe(source_url).await?;
        let duration_secs = info.duration.map(|d| d.round() as u32).unwrap_or(0);

        if duration_secs > self.max_duration_secs {
            return Err(DownloadError::TooLong(duration_secs));
        }

        if let Err(e) = std::fs::create_dir_all(&self.cache_dir) {
            return Err(DownloadError::YtDlp(format!(
                "Failed to create cache directory {}: {}",
                self.cache_dir.display(),
                e
            )));
        }

        self.download(source_url).await?;

        // The postprocessor always lands on .mp3 regardless of source ext.
        let path = self.cache_dir.join(format!("{}.mp3", info.id));
        if !path.exists() {
            return Err(DownloadError::FileNotFound(path.to_string_lossy().to_string()));
        }

        Ok(FetchedAudio {
            path,
            duration_secs,
            performer: info.uploader.unwrap_or_default(),
            title: info.title.unwrap_or_default(),
            thumbnail_url: info.thumbnail,
        })
    }
}

/// Caps a yt-dlp diagnostic at a readable size without splitting a UTF-8
/// code point.
fn truncate_diagnostic(text: &str) -> String {
    const MAX: usize = 500;
    let trimmed = text.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_string();
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

/// Logs the installed yt-dlp version at startup; a missing binary is
/// reported but does not abort boot.
pub async fn log_ytdlp_version() {
    let bin = config::YTDL_BIN.clone();
    match TokioCommand::new(&bin).arg("--version").output().await {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            log::info!("yt-dlp version: {}", version);
        }
        Ok(output) => {
            log::warn!("yt-dlp --version exited with status {}", output.status);
        }
        Err(e) => {
            log::warn!("yt-dlp not found ({}); downloads will fail until it is installed", e);
        }
    }
}
