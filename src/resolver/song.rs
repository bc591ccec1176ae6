//! Canonical song record produced by the resolver.

/// Whether a resolved link points at a single track or a whole album.
///
/// Albums are never downloadable; only tracks enter the download pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Track,
    Album,
}

/// Streaming platforms we surface links for.
///
/// `All` is the canonical song.link page that aggregates every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    All,
    Spotify,
    Yandex,
    YtMusic,
}

impl Platform {
    /// Display name used in captions and link lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::All => "All",
            Platform::Spotify => "Spotify",
            Platform::Yandex => "Yandex",
            Platform::YtMusic => "YTMusic",
        }
    }
}

/// Canonical multi-platform representation of a resolved track or album.
///
/// `canonical_url` is the stable identifier: it keys the file cache and is
/// used as the inline-result id, so it must come out the same for every
/// equivalent input URL.
#[derive(Debug, Clone)]
pub struct SongRecord {
    pub canonical_url: String,
    pub title: String,
    pub artist_name: String,
    pub thumbnail_url: Option<String>,
    pub content_type: ContentType,
    /// Ordered platform → URL pairs; `All` always comes first when present.
    pub platform_urls: Vec<(Platform, String)>,
}

impl SongRecord {
    /// URL for a specific platform, if the resolver found one.
    pub fn url_for(&self, platform: Platform) -> Option<&str> {
        self.platform_urls
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, url)| url.as_str())
    }

    /// The only URL the fetcher may use as a download source.
    pub fn download_source(&self) -> Option<&str> {
        self.url_for(Platform::YtMusic)
    }

    /// Tracks with a YTMusic link can be fetched; everything else is share-only.
    pub fn is_downloadable(&self) -> bool {
        self.content_type == ContentType::Track && self.download_source().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content_type: ContentType, urls: Vec<(Platform, &str)>) -> SongRecord {
        SongRecord {
            canonical_url: "https://song.link/s/abc".to_string(),
            title: "Test".to_string(),
            artist_name: "Artist".to_string(),
            thumbnail_url: None,
            content_type,
            platform_urls: urls.into_iter().map(|(p, u)| (p, u.to_string())).collect(),
        }
    }

    #[test]
    fn track_with_ytmusic_link_is_downloadable() {
        let song = record(
            ContentType::Track,
            vec![
                (Platform::All, "https://song.link/s/abc"),
                (Platform::YtMusic, "https://music.youtube.com/watch?v=xyz"),
            ],
        );
        assert!(song.is_downloadable());
        assert_eq!(song.download_source(), Some("https://music.youtube.com/watch?v=xyz"));
    }

    #[test]
    fn album_is_never_downloadable() {
        let album = record(
            ContentType::Album,
            vec![
                (Platform::All, "https://song.link/a/abc"),
                (Platform::YtMusic, "https://music.youtube.com/playlist?list=x"),
            ],
        );
        assert!(!album.is_downloadable());
    }

    #[test]
    fn track_without_download_source_is_share_only() {
        let song = record(ContentType::Track, vec![(Platform::All, "https://song.link/s/abc")]);
        assert!(!song.is_downloadable());
        assert_eq!(song.download_source(), None);
    }
}
