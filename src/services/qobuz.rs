//! Qobuz acquisition.
//!
//! ISRC -> search (first hit) -> download URL from the first answering
//! download API -> streamed download.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::{TrackSource, dto};
use crate::error::FetchError;
use crate::http::{self, COVER_TIMEOUT, Fetch, SEARCH_TIMEOUT};
use crate::model::{AcquisitionRequest, Service};
use crate::progress::ProgressReporter;

pub struct QobuzSource {
    search_url: String,
    download_apis: Vec<String>,
    fetch: Arc<dyn Fetch>,
    progress: Arc<dyn ProgressReporter>,
}

impl QobuzSource {
    pub fn new(
        search_url: impl Into<String>,
        download_apis: Vec<String>,
        fetch: Arc<dyn Fetch>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            search_url: search_url.into(),
            download_apis,
            fetch,
            progress,
        }
    }

    /// First search hit for an ISRC.
    async fn search_isrc(&self, isrc: &str) -> Result<dto::QobuzTrack, FetchError> {
        tracing::debug!("Searching ISRC: {}", isrc);
        let url = format!("{}?q={}&offset=0", self.search_url, urlencoding::encode(isrc));
        let response: dto::QobuzSearchResponse =
            http::get_json(self.fetch.as_ref(), &url, SEARCH_TIMEOUT).await?;

        let track = first_track(response).ok_or_else(|| FetchError::NotFound(format!("no Qobuz track for ISRC {}", isrc)))?;
        tracing::info!(
            "Found: {} by {}",
            track.title.as_deref().unwrap_or("Unknown"),
            track
                .performer
                .as_ref()
                .and_then(|p| p.name.as_deref())
                .unwrap_or("Unknown")
        );
        Ok(track)
    }

    async fn download_url(&self, track_id: &str, quality: &str) -> Result<String, FetchError> {
        for api in &self.download_apis {
            let url = format!("{}{}&quality={}", api, track_id, quality);
            match http::get_json::<dto::QobuzDownloadResponse>(self.fetch.as_ref(), &url, COVER_TIMEOUT).await {
                Ok(response) => {
                    if let Some(download_url) = pick_download_url(response) {
                        return Ok(download_url);
                    }
                }
                Err(e) => tracing::warn!("Download API request failed: {}", e),
            }
        }
        Err(FetchError::NotFound("Qobuz download URL".into()))
    }
}

/// Tracks live under `data.tracks` on the wrapped shape, `tracks` otherwise.
fn first_track(response: dto::QobuzSearchResponse) -> Option<dto::QobuzTrack> {
    let page = match response.data {
        Some(data) if response.success => data.tracks,
        _ => response.tracks,
    };
    page?.items.into_iter().next()
}

fn pick_download_url(response: dto::QobuzDownloadResponse) -> Option<String> {
    let nested = response
        .data
        .as_ref()
        .and_then(|d| d.get("url"))
        .and_then(|u| u.as_str())
        .map(str::to_string);

    [response.url, response.download_url, response.stream_url, nested]
        .into_iter()
        .flatten()
        .find(|u| !u.is_empty())
}

#[async_trait]
impl TrackSource for QobuzSource {
    fn service(&self) -> Service {
        Service::Qobuz
    }

    async fn fetch(&self, request: &AcquisitionRequest, dest: &Path) -> Result<(), FetchError> {
        if request.isrc.is_empty() {
            return Err(FetchError::MissingIdentifier("isrc"));
        }

        let track = self.search_isrc(&request.isrc).await?;
        let track_id = dto::id_text(&track.id)
            .ok_or_else(|| FetchError::Parse("search hit has no id".into()))?;

        let url = self.download_url(&track_id, &request.qobuz_quality).await?;

        tracing::info!("Downloading...");
        self.fetch
            .download_to(&url, dest, "Qobuz", self.progress.as_ref())
            .await?;
        Ok(())
    }
}
