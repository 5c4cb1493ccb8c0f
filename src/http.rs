//! Shared HTTP plumbing.
//!
//! One `reqwest::Client` is built in the CLI and cloned into every client.
//! Byte transfers and service JSON calls go through the [`Fetch`] trait so
//! the reconstructor and the services can be tested without a network.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::progress::ProgressReporter;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("tunefetch/", env!("CARGO_PKG_VERSION"));

/// Browser user agent, for pages that refuse API clients (Apple Music).
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(15);
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const COVER_TIMEOUT: Duration = Duration::from_secs(30);
pub const SONG_LINK_TIMEOUT: Duration = Duration::from_secs(30);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the process-wide HTTP client.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Map a non-success status to the matching [`FetchError`].
pub fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(response.url().to_string()));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }

    if !status.is_success() {
        return Err(FetchError::Network(format!(
            "HTTP {}: {}",
            status,
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    Ok(response)
}

/// Byte transfer abstraction.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch a whole (small) body into memory within `timeout`.
    async fn get_body(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;

    /// Fetch a whole body with the download timeout.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get_body(url, DOWNLOAD_TIMEOUT).await
    }

    /// Stream a body into `dest`, replacing it. Returns bytes written.
    ///
    /// A failed transfer leaves no file behind.
    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<u64, FetchError>;
}

/// GET `url` and decode the body as JSON.
pub async fn get_json<T: DeserializeOwned>(
    fetch: &dyn Fetch,
    url: &str,
    timeout: Duration,
) -> Result<T, FetchError> {
    let body = fetch.get_body(url, timeout).await?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Parse(format!("{}: {}", url, e)))
}

/// [`Fetch`] over a real `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn stream_into(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<u64, FetchError> {
        let response = self
            .http_client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let mut response = check_status(response)?;

        progress.start(label, response.content_length());

        let mut file = std::fs::File::create(dest)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
            progress.advance(chunk.len() as u64);
        }
        file.flush()?;

        progress.finish();
        Ok(written)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_body(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http_client
            .get(url)
            .timeout(timeout)
            .send()
            .await?;
        let response = check_status(response)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<u64, FetchError> {
        let result = self.stream_into(url, dest, label, progress).await;
        if result.is_err() {
            progress.finish();
            if dest.exists() {
                let _ = std::fs::remove_file(dest);
            }
        }
        result
    }
}
