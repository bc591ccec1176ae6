use thiserror::Error;

/// Structured error type for the fetch/download surface.
///
/// The taxonomy is deliberately coarse: the duration ceiling and the
/// missing-source case get their own variants because the UI words them
/// differently; everything the external tool throws collapses into
/// `YtDlp` with the raw diagnostic.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Probed duration exceeds the ceiling; nothing was downloaded.
    #[error("Track is too long ({0} sec)")]
    TooLong(u32),

    /// The song resolved, but no platform offers a download-capable source.
    #[error("No downloadable source for this track")]
    NoSource,

    /// yt-dlp failure of any kind (network, geo-block, unsupported source).
    #[error("{0}")]
    YtDlp(String),

    /// Expected file missing after the tool reported success.
    #[error("Downloaded file not found: {0}")]
    FileNotFound(String),

    /// The external tool ran past its timeout.
    #[error("Download timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_long_display_includes_duration() {
        let err = DownloadError::TooLong(601);
        assert_eq!(err.to_string(), "Track is too long (601 sec)");
    }

    #[test]
    fn ytdlp_display_is_raw_diagnostic() {
        let err = DownloadError::YtDlp("ERROR: video unavailable".into());
        assert_eq!(err.to_string(), "ERROR: video unavailable");
    }
}
