//! Spotify Web API client
//!
//! Authenticates with client credentials (or uses a configured bearer token)
//! and pages through album and playlist listings.
//! See: https://developer.spotify.com/documentation/web-api

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CatalogAlbum, CatalogApi, CatalogError, CatalogTrack, adapter, dto};
use crate::http::DEFAULT_TIMEOUT;

/// Attempts per request while rate limited.
const MAX_ATTEMPTS: u32 = 3;
/// Wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);
/// Refresh tokens this long before they expire.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// How to authenticate.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// Pre-issued bearer token; takes precedence over the client pair
    pub token: String,
}

impl Credentials {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() || (!self.client_id.is_empty() && !self.client_secret.is_empty())
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Spotify API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    api_base: String,
    token_url: String,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(
        http_client: reqwest::Client,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into(),
            token_url: token_url.into(),
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        if !self.credentials.token.is_empty() {
            return Ok(self.credentials.token.clone());
        }

        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|t| Instant::now() < t.expires_at)
            .map(|t| t.value.clone());
        if let Some(value) = cached {
            return Ok(value);
        }

        if !self.credentials.is_configured() {
            return Err(CatalogError::Auth(
                "no Spotify client_id/client_secret or token configured".into(),
            ));
        }

        tracing::debug!("Requesting Spotify access token");
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Auth(format!("token request returned {}", response.status())));
        }

        let token: dto::TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_MARGIN);
        *self.token.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// GET an API URL, waiting out 429s.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let token = self.access_token().await?;
            let response = self
                .http_client
                .get(url)
                .bearer_auth(&token)
                .timeout(DEFAULT_TIMEOUT)
                .send()
                .await
                .map_err(|e| CatalogError::Network(e.to_string()))?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(response.headers());
                tracing::warn!(
                    "Rate limited. Waiting {}s (attempt {}/{})",
                    wait.as_secs(),
                    attempt,
                    MAX_ATTEMPTS
                );
                // A fresh token sometimes lands in a fresh rate-limit bucket
                self.token.lock().take();
                tokio::time::sleep(wait).await;
                continue;
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(CatalogError::NotFound(url.to_string()));
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.token.lock().take();
                return Err(CatalogError::Auth(format!("HTTP {}", status)));
            }

            if !status.is_success() {
                return Err(CatalogError::Network(format!(
                    "HTTP {}: {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown")
                )));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| CatalogError::Parse(e.to_string()));
        }

        tracing::error!("Spotify API rate limit exceeded after retries. Please wait a few minutes.");
        Err(CatalogError::RateLimited)
    }

    /// Follow `next` links until the listing ends.
    async fn get_all<T: serde::de::DeserializeOwned>(&self, first: String) -> Result<Vec<T>, CatalogError> {
        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next {
            let page: dto::Paging<T> = self.get_json(&url).await?;
            items.extend(page.items);
            next = page.next;
        }
        Ok(items)
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    async fn track(&self, id: &str) -> Result<CatalogTrack, CatalogError> {
        let url = format!("{}/tracks/{}", self.api_base, id);
        let track: dto::Track = self.get_json(&url).await?;
        Ok(adapter::to_track(track))
    }

    async fn album(&self, id: &str) -> Result<CatalogAlbum, CatalogError> {
        let album: dto::Album = self.get_json(&format!("{}/albums/{}", self.api_base, id)).await?;
        Ok(adapter::to_album(album))
    }

    async fn album_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        let url = format!("{}/albums/{}/tracks?limit=50", self.api_base, id);
        let tracks: Vec<dto::Track> = self.get_all(url).await?;
        Ok(tracks.into_iter().map(adapter::to_track).collect())
    }

    async fn playlist_name(&self, id: &str) -> Result<Option<String>, CatalogError> {
        let url = format!("{}/playlists/{}?fields=name", self.api_base, id);
        let playlist: dto::Playlist = self.get_json(&url).await?;
        Ok(playlist.name.filter(|n| !n.is_empty()))
    }

    async fn playlist_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        let url = format!("{}/playlists/{}/tracks?limit=100", self.api_base, id);
        let items: Vec<dto::PlaylistItem> = self.get_all(url).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.track)
            .map(adapter::to_track)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Duration::from_secs(12));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER);
    }

    #[test]
    fn test_credentials_configured() {
        assert!(!Credentials::default().is_configured());
        assert!(
            Credentials {
                token: "t".into(),
                ..Default::default()
            }
            .is_configured()
        );
        assert!(
            !Credentials {
                client_id: "id".into(),
                ..Default::default()
            }
            .is_configured()
        );
    }

    #[tokio::test]
    async fn test_configured_token_is_used_verbatim() {
        let client = SpotifyClient::new(
            reqwest::Client::new(),
            "https://api.invalid/v1",
            "https://accounts.invalid/api/token",
            Credentials {
                token: "bearer-123".into(),
                ..Default::default()
            },
        );
        assert_eq!(client.access_token().await.unwrap(), "bearer-123");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_network() {
        let client = SpotifyClient::new(
            reqwest::Client::new(),
            "https://api.invalid/v1",
            "https://accounts.invalid/api/token",
            Credentials::default(),
        );
        assert!(matches!(client.access_token().await, Err(CatalogError::Auth(_))));
    }
}
