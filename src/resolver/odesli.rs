//! Odesli (song.link) API client: resolves an arbitrary music URL to a
//! canonical cross-platform record.
//!
//! Calls https://api.song.link to get streaming links for a given URL.
//! Free API, no key required. Rate limit: 10 req/sec.

use crate::resolver::song::{ContentType, Platform, SongRecord};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Production API endpoint; tests point at a local stub.
pub const API_BASE: &str = "https://api.song.link/v1-alpha.1";

/// Platform-tagged entity keys whose metadata is unreliable or redundant
/// for canonicalization. Substring match against the entity key.
const EXCLUDED_ENTITY_KEYS: [&str; 4] = ["ANGHAMI_SONG", "BOOMPLAY_SONG", "YOUTUBE", "SOUNDCLOUD"];

#[derive(Debug, Deserialize)]
pub struct LinksResponse {
    // BTreeMap keeps entity iteration deterministic; the upstream JSON
    // object order is not guaranteed to survive deserialization.
    #[serde(rename = "entitiesByUniqueId", default)]
    pub entities_by_unique_id: BTreeMap<String, Entity>,
    #[serde(rename = "linksByPlatform", default)]
    pub links_by_platform: BTreeMap<String, PlatformEntry>,
    #[serde(rename = "pageUrl")]
    pub page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Entity {
    pub title: Option<String>,
    #[serde(rename = "artistName")]
    pub artist_name: Option<String>,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlatformEntry {
    pub url: String,
}

/// Fetches and canonicalizes song info for a URL.
///
/// Returns `None` silently on any error: an unrecognized or unreachable
/// link must never crash the dispatch path.
pub async fn resolve_by_url(client: &reqwest::Client, api_base: &str, source_url: &str) -> Option<SongRecord> {
    let api_url = format!("{}/links?url={}", api_base, urlencoding::encode(source_url));

    let response = client.get(&api_url).send().await.ok()?;
    if !response.status().is_success() {
        log::debug!("Odesli API returned status {} for {}", response.status(), source_url);
        return None;
    }

    let data: LinksResponse = response.json().await.ok()?;
    build_record(data)
}

/// Applies the selection/merge policy to a parsed Odesli response.
///
/// Picks the first entity (deterministic key order) that carries a
/// thumbnail and is not in the excluded platform set, then overlays the
/// known platform links on top of the canonical page URL.
pub fn build_record(data: LinksResponse) -> Option<SongRecord> {
    let (_, entity) = data.entities_by_unique_id.iter().find(|(key, entity)| {
        entity.thumbnail_url.is_some() && !EXCLUDED_ENTITY_KEYS.iter().any(|excluded| key.contains(excluded))
    })?;

    let content_type = match entity.kind.as_deref() {
        Some("album") => ContentType::Album,
        _ => ContentType::Track,
    };

    let canonical_url = data.page_url.clone()?;

    let mut platform_urls = vec![(Platform::All, canonical_url.clone())];
    for (api_key, platform) in [
        ("spotify", Platform::Spotify),
        ("yandex", Platform::Yandex),
        ("youtubeMusic", Platform::YtMusic),
    ] {
        if let Some(entry) = data.links_by_platform.get(api_key) {
            platform_urls.push((platform, entry.url.clone()));
        }
    }

    Some(SongRecord {
        canonical_url,
        title: entity.title.clone().unwrap_or_default(),
        artist_name: entity.artist_name.clone().unwrap_or_default(),
        thumbnail_url: entity.thumbnail_url.clone(),
        content_type,
        platform_urls,
    })
}
