//! Spotify catalog search used for free-text inline queries.
//!
//! Auth is the client-credentials flow: the bearer token is an opaque,
//! auto-refreshing value checked on every read and renewed shortly before
//! the advertised expiry.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Production endpoints; tests point at a local stub.
pub const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const API_BASE: &str = "https://api.spotify.com";

/// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: u64 = 10;

/// One search result in the service's relevance order.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub artist: String,
    pub title: String,
    pub url: String,
    pub id: String,
}

#[derive(Debug)]
struct TokenState {
    token: String,
    expires_at: Instant,
}

/// Shared credential handle: explicitly constructed, explicitly passed,
/// refresh-on-read behind an async mutex.
pub struct SpotifyTokenManager {
    client_id: String,
    client_secret: String,
    accounts_base: String,
    state: Mutex<Option<TokenState>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl SpotifyTokenManager {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_accounts_base(client_id, client_secret, ACCOUNTS_BASE.to_string())
    }

    pub fn with_accounts_base(client_id: String, client_secret: String, accounts_base: String) -> Self {
        Self {
            client_id,
            client_secret,
            accounts_base,
            state: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, refreshing it first if missing or
    /// within the expiry margin.
    pub async fn bearer(&self, client: &reqwest::Client) -> Option<String> {
        let mut state = self.state.lock().await;

        let fresh = state
            .as_ref()
            .map(|s| s.expires_at > Instant::now())
            .unwrap_or(false);
        if !fresh {
            *state = self.fetch_token(client).await;
        }

        state.as_ref().map(|s| s.token.clone())
    }

    async fn fetch_token(&self, client: &reqwest::Client) -> Option<TokenState> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = client
            .post(format!("{}/api/token", self.accounts_base))
            .form(&params)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            log::error!("Spotify token exchange failed with status {}", response.status());
            return None;
        }

        let data: TokenResponse = response.json().await.ok()?;
        let lifetime = data.expires_in.saturating_sub(EXPIRY_MARGIN_SECS);
        Some(TokenState {
            token: data.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Tracks,
}

#[derive(Deserialize)]
struct Tracks {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct TrackItem {
    name: String,
    id: String,
    #[serde(default)]
    artists: Vec<ArtistItem>,
    external_urls: ExternalUrls,
}

#[derive(Deserialize)]
struct ArtistItem {
    name: String,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Free-text track search; returns up to `limit` hits in relevance order.
///
/// Network, auth, and parse failures all collapse to an empty vec; the
/// caller treats that as "no results."
pub async fn search(
    client: &reqwest::Client,
    api_base: &str,
    tokens: &SpotifyTokenManager,
    query: &str,
    limit: u32,
) -> Vec<SearchHit> {
    let Some(token) = tokens.bearer(client).await else {
        log::warn!("Spotify search skipped: no bearer token available");
        return Vec::new();
    };

    let url = format!(
        "{}/v1/search?q={}&type=track&limit={}",
        api_base,
        urlencoding::encode(query),
        limit
    );

    let response = match client.get(&url).bearer_auth(&token).send().await {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Spotify search request failed: {}", e);
            return Vec::new();
        }
    };

    if !response.status().is_success() {
        log::warn!("Spotify search returned status {}", response.status());
        return Vec::new();
    }

    let data: SearchResponse = match response.json().await {
        Ok(d) => d,
        Err(e) => {
            log::warn!("Spotify search response parse failed: {}", e);
            return Vec::new();
        }
    };

    data.tracks
        .items
        .into_iter()
        .filter_map(|track| {
            let url = track.external_urls.spotify?;
            let artist = track.artists.first().map(|a| a.name.clone()).unwrap_or_default();
            Some(SearchHit {
                artist,
                title: track.name,
                url,
                id: track.id,
            })
        })
        .collect()
}
