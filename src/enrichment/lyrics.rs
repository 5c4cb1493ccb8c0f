//! LRCLIB lyrics client
//!
//! Looks lyrics up by exact title/artist first, then by free-text search.
//! Synced (LRC) lyrics win over plain text.
//! See: https://lrclib.net/docs

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::error::FetchError;
use crate::http::{self, DEFAULT_TIMEOUT};

/// Transport retries per request.
const MAX_RETRIES: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// One LRCLIB record (`/api/get` returns one, `/api/search` a list)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRecord {
    pub synced_lyrics: Option<String>,
    pub plain_lyrics: Option<String>,
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

impl LyricsRecord {
    fn best(&self) -> Option<String> {
        non_empty(&self.synced_lyrics).or_else(|| non_empty(&self.plain_lyrics))
    }
}

/// Synced lyrics from any result, else the first result's plain lyrics.
fn pick_from_search(records: &[LyricsRecord]) -> Option<String> {
    records
        .iter()
        .find_map(|r| non_empty(&r.synced_lyrics))
        .or_else(|| records.first().and_then(|r| non_empty(&r.plain_lyrics)))
}

/// Title without bracketed or dashed suffixes ("Song (Remastered) - Live" -> "Song").
pub fn simplify_title(title: &str) -> String {
    title
        .split('(')
        .next()
        .unwrap_or(title)
        .split('-')
        .next()
        .unwrap_or(title)
        .trim()
        .to_string()
}

/// LRCLIB API client
pub struct LrcLibClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LrcLibClient {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Lyrics for a track, retrying once with a simplified title.
    pub async fn fetch_lyrics(&self, title: &str, artist: &str) -> Option<String> {
        if let Some(lyrics) = self.lookup(title, artist).await {
            return Some(lyrics);
        }

        let simple = simplify_title(title);
        if !simple.is_empty() && simple != title {
            tracing::debug!("Retrying lyrics lookup as '{}'", simple);
            return self.lookup(&simple, artist).await;
        }

        None
    }

    async fn lookup(&self, title: &str, artist: &str) -> Option<String> {
        match with_retries(|| self.get_exact(title, artist)).await {
            Ok(Some(lyrics)) => return Some(lyrics),
            Ok(None) => {}
            Err(e) => tracing::debug!("LRCLIB get failed: {}", e),
        }

        match with_retries(|| self.search(title, artist)).await {
            Ok(lyrics) => lyrics,
            Err(e) => {
                tracing::debug!("LRCLIB search failed: {}", e);
                None
            }
        }
    }

    async fn get_exact(&self, title: &str, artist: &str) -> Result<Option<String>, FetchError> {
        let url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );
        match self.get_json::<LyricsRecord>(&url).await {
            Ok(record) => Ok(record.best()),
            Err(FetchError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search(&self, title: &str, artist: &str) -> Result<Option<String>, FetchError> {
        let query = format!("{} {}", artist, title);
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(&query));
        let records = self.get_json::<Vec<LyricsRecord>>(&url).await?;
        Ok(pick_from_search(&records))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .http_client
            .get(url)
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        http::check_status(response)?
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// Run `op`, retrying transient failures with a fixed backoff.
async fn with_retries<T, F, Fut>(mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::debug!("Transient error ({}), retry {}/{}", e, attempt, MAX_RETRIES);
                tokio::time::sleep(RETRY_DELAY).await;
            }
            other => return other,
        }
    }
}
