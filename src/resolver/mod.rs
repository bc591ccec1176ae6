//! Song resolution: canonical records from URLs (Odesli) and free-text
//! catalog search (Spotify).

pub mod odesli;
pub mod song;
pub mod spotify;

pub use song::{ContentType, Platform, SongRecord};
pub use spotify::SearchHit;

use crate::core::config;
use crate::core::error::AppResult;
use async_trait::async_trait;
use spotify::SpotifyTokenManager;

/// Resolution seam consumed by the download orchestrator, so the state
/// machine can be tested without network access.
#[async_trait]
pub trait SongLookup: Send + Sync {
    /// Resolves a URL to a canonical record; `None` means "not a
    /// recognized music link."
    async fn resolve_by_url(&self, url: &str) -> Option<SongRecord>;
}

/// Resolver service handle: one shared HTTP client plus the Spotify
/// credential cache.
pub struct SongResolver {
    client: reqwest::Client,
    spotify_tokens: SpotifyTokenManager,
    odesli_base: String,
    spotify_api_base: String,
}

impl SongResolver {
    /// Builds the resolver from environment configuration.
    pub fn from_env() -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self {
            client,
            spotify_tokens: SpotifyTokenManager::new(
                config::SPOTIFY_CLIENT_ID.clone(),
                config::SPOTIFY_CLIENT_SECRET.clone(),
            ),
            odesli_base: odesli::API_BASE.to_string(),
            spotify_api_base: spotify::API_BASE.to_string(),
        })
    }

    /// Test constructor with every external endpoint overridden.
    pub fn with_endpoints(
        client: reqwest::Client,
        spotify_tokens: SpotifyTokenManager,
        odesli_base: String,
        spotify_api_base: String,
    ) -> Self {
        Self {
            client,
            spotify_tokens,
            odesli_base,
            spotify_api_base,
        }
    }

    /// Free-text search; up to `limit` hits in relevance order, empty on
    /// any failure.
    pub async fn search(&self, query: &str, limit: u32) -> Vec<SearchHit> {
        spotify::search(&self.client, &self.spotify_api_base, &self.spotify_tokens, query, limit).await
    }
}

#[async_trait]
impl SongLookup for SongResolver {
    async fn resolve_by_url(&self, url: &str) -> Option<SongRecord> {
        let record = odesli::resolve_by_url(&self.client, &self.odesli_base, url).await?;
        // Records with no platform URLs are unresolved and must never
        // reach the cache or download path.
        if record.platform_urls.is_empty() {
            return None;
        }
        Some(record)
    }
}
