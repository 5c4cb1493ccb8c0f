//! song.link HTTP client
//!
//! Maps a Spotify track id to its URLs on other platforms.
//! See: https://odesli.co
//!
//! IMPORTANT: song.link rate limits anonymous callers hard. Every request
//! goes through the shared [`SharedBudget`].

use async_trait::async_trait;
use parking_lot::Mutex;

use super::rate::{self, SharedBudget};
use super::{LinkResolver, PlatformLinks, dto};
use crate::error::FetchError;
use crate::http::{self, SONG_LINK_TIMEOUT};

const SPOTIFY_TRACK_BASE: &str = "https://open.spotify.com/track/";

/// song.link API client
pub struct SongLinkClient {
    http_client: reqwest::Client,
    base_url: String,
    budget: SharedBudget,
    /// Last successful, non-empty lookup
    last: Mutex<Option<(String, PlatformLinks)>>,
}

impl SongLinkClient {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, budget: SharedBudget) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            budget,
            last: Mutex::new(None),
        }
    }

    fn links_url(&self, catalog_id: &str) -> String {
        let spotify_url = format!("{}{}", SPOTIFY_TRACK_BASE, catalog_id);
        format!("{}?url={}", self.base_url, urlencoding::encode(&spotify_url))
    }

    fn memoized(&self, catalog_id: &str) -> Option<PlatformLinks> {
        self.last
            .lock()
            .as_ref()
            .filter(|(id, _)| id == catalog_id)
            .map(|(_, links)| links.clone())
    }

    /// Send the HTTP request and parse the response
    async fn send_links_request(&self, catalog_id: &str) -> Result<dto::LinksResponse, FetchError> {
        rate::acquire(&self.budget).await;

        let response = self
            .http_client
            .get(self.links_url(catalog_id))
            .timeout(SONG_LINK_TIMEOUT)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        http::check_status(response)?
            .json::<dto::LinksResponse>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LinkResolver for SongLinkClient {
    async fn resolve(&self, catalog_id: &str) -> PlatformLinks {
        if catalog_id.is_empty() {
            return PlatformLinks::default();
        }

        if let Some(links) = self.memoized(catalog_id) {
            tracing::debug!("song.link: reusing links for {}", catalog_id);
            return links;
        }

        match self.send_links_request(catalog_id).await {
            Ok(response) => {
                let links = PlatformLinks::from(response);
                if !links.is_empty() {
                    *self.last.lock() = Some((catalog_id.to_string(), links.clone()));
                }
                links
            }
            Err(FetchError::RateLimited) => {
                tracing::warn!("song.link rate limit active");
                PlatformLinks::default()
            }
            Err(e) => {
                tracing::warn!("song.link lookup failed for {}: {}", catalog_id, e);
                PlatformLinks::default()
            }
        }
    }
}
