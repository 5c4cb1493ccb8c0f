//! Cover artwork: Apple Music artwork, catalog artwork and the per-album cache.
//!
//! Apple Music pages reference artwork as
//! `https://isN-ssl.mzstatic.com/image/thumb/Music.../<W>x<H>bb.jpg`; the part
//! before the size is a base URL that serves any size and format.

use regex::Regex;

use crate::http::{BROWSER_USER_AGENT, COVER_TIMEOUT, SEARCH_TIMEOUT};

/// Apple responses at or below this size are error placeholders.
const MIN_ARTWORK_BYTES: usize = 5000;

/// Catalog (Spotify) 640px artwork marker and its max-size counterpart.
const CATALOG_DEFAULT_SIZE: &str = "ab67616d0000b273";
const CATALOG_MAX_SIZE: &str = "ab67616d000082c1";

/// Rewrite a catalog cover URL to its largest variant.
pub fn max_size_catalog_url(url: &str) -> String {
    url.replace(CATALOG_DEFAULT_SIZE, CATALOG_MAX_SIZE)
}

/// Artwork base URL from an Apple Music page, ending in `/`.
pub fn extract_artwork_base(html: &str) -> Option<String> {
    let thumb = Regex::new(
        r#"(https://is\d+-ssl\.mzstatic\.com/image/thumb/Music[^"']+/)\d+x\d+[a-z]*\.[a-z]+"#,
    )
    .ok()?;
    if let Some(c) = thumb.captures(html) {
        return Some(c[1].to_string());
    }

    let json = Regex::new(r#""artworkUrl100"\s*:\s*"([^"]+)""#).ok()?;
    let url = json.captures(html)?[1].to_string();
    let size_suffix = Regex::new(r"\d+x\d+[a-z]*\.[a-z]+$").ok()?;
    Some(size_suffix.replace(&url, "").into_owned())
}

/// HTTP client for artwork.
pub struct ArtworkClient {
    http_client: reqwest::Client,
}

impl ArtworkClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn get(&self, url: &str, timeout: std::time::Duration, browser: bool) -> Option<reqwest::Response> {
        let mut request = self.http_client.get(url).timeout(timeout);
        if browser {
            request = request.header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT);
        }
        match request.send().await {
            Ok(response) if response.status().is_success() => Some(response),
            Ok(response) => {
                tracing::debug!("Artwork request {} returned {}", url, response.status());
                None
            }
            Err(e) => {
                tracing::debug!("Artwork request {} failed: {}", url, e);
                None
            }
        }
    }

    /// Fetch an Apple Music page and extract its artwork base.
    pub async fn apple_artwork_base(&self, page_url: &str) -> Option<String> {
        let html = self.get(page_url, SEARCH_TIMEOUT, true).await?.text().await.ok()?;
        extract_artwork_base(&html)
    }

    /// `{base}{size}x{size}.{ext}`, only if it looks like a real image.
    pub async fn apple_artwork(&self, base: &str, size: u32, ext: &str) -> Option<Vec<u8>> {
        let url = format!("{}{}x{}.{}", base, size, size, ext);
        tracing::debug!("Trying artwork: {}", url);
        let bytes = self.get(&url, COVER_TIMEOUT, false).await?.bytes().await.ok()?;
        (bytes.len() > MIN_ARTWORK_BYTES).then(|| bytes.to_vec())
    }

    /// Catalog artwork at its largest size.
    pub async fn catalog_artwork(&self, url: &str) -> Option<Vec<u8>> {
        let url = max_size_catalog_url(url);
        let bytes = self.get(&url, COVER_TIMEOUT, false).await?.bytes().await.ok()?;
        Some(bytes.to_vec())
    }
}

/// Artwork remembered for the album currently being processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverCacheEntry {
    pub album_key: String,
    /// Embedding-quality cover bytes
    pub cover: Option<Vec<u8>>,
    /// Apple artwork base the cover came from
    pub apple_base: Option<String>,
}

/// Single-entry, in-memory cover cache keyed by album.
#[derive(Debug, Default)]
pub struct CoverCache {
    entry: Option<CoverCacheEntry>,
}

impl CoverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached cover bytes for this album, if any.
    pub fn get(&self, album_key: &str) -> Option<&[u8]> {
        self.entry
            .as_ref()
            .filter(|e| e.album_key == album_key)
            .and_then(|e| e.cover.as_deref())
    }

    /// The entry for `album_key`, replacing whatever other album was cached.
    pub fn entry(&mut self, album_key: &str) -> &mut CoverCacheEntry {
        let stale = self
            .entry
            .as_ref()
            .is_none_or(|e| e.album_key != album_key);
        if stale {
            self.entry = Some(CoverCacheEntry {
                album_key: album_key.to_string(),
                ..Default::default()
            });
        }
        self.entry.get_or_insert_with(Default::default)
    }

    pub fn contains(&self, album_key: &str) -> bool {
        self.get(album_key).is_some()
    }
}
