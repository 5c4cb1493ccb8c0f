//! Amazon Music acquisition.
//!
//! catalog id -> song.link -> Amazon track URL -> per region: submit the URL
//! to the download service, poll the job until it is done, download the file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{TrackSource, dto};
use crate::endpoints::Endpoints;
use crate::error::FetchError;
use crate::http::{self, DEFAULT_TIMEOUT, Fetch};
use crate::model::{AcquisitionRequest, Service};
use crate::progress::ProgressReporter;
use crate::resolver::LinkResolver;

const MAX_POLL_ATTEMPTS: u32 = 60;
const POLL_INTERVAL: Duration = Duration::from_secs(3);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AmazonSource {
    endpoints: Endpoints,
    regions: Vec<String>,
    resolver: Arc<dyn LinkResolver>,
    fetch: Arc<dyn Fetch>,
    progress: Arc<dyn ProgressReporter>,
}

impl AmazonSource {
    pub fn new(
        endpoints: Endpoints,
        region: &str,
        resolver: Arc<dyn LinkResolver>,
        fetch: Arc<dyn Fetch>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            endpoints,
            regions: region_order(region),
            resolver,
            fetch,
            progress,
        }
    }

    async fn try_region(&self, region: &str, amazon_url: &str, dest: &Path) -> Result<(), FetchError> {
        let base_url = self.endpoints.amazon_base(region);

        tracing::debug!("Submitting download request");
        let submit_url = format!("{}/dl?url={}", base_url, urlencoding::encode(amazon_url));
        let submitted: dto::AmazonSubmitResponse =
            http::get_json(self.fetch.as_ref(), &submit_url, SUBMIT_TIMEOUT).await?;
        let job_id = submitted
            .id
            .as_ref()
            .and_then(dto::id_text)
            .filter(|_| submitted.success)
            .ok_or_else(|| FetchError::NotFound("download request rejected".into()))?;
        tracing::debug!("+ Download ID: {}", job_id);

        let status_url = format!("{}/dl/{}", base_url, job_id);
        tracing::info!("Waiting for download to complete...");
        for _ in 0..MAX_POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let Some(status) = self.poll_status(&status_url).await? else {
                continue;
            };

            match status.status.as_str() {
                "done" => {
                    let file_url = status
                        .url
                        .map(|u| resolve_file_url(&base_url, &u))
                        .ok_or_else(|| FetchError::Parse("finished job has no URL".into()))?;
                    let label = dest
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    self.fetch
                        .download_to(&file_url, dest, &label, self.progress.as_ref())
                        .await?;
                    return Ok(());
                }
                "error" => {
                    return Err(FetchError::Network(
                        status.error.unwrap_or_else(|| "Unknown".to_string()),
                    ));
                }
                _ => {}
            }
        }

        Err(FetchError::Network(format!(
            "download not ready after {}s",
            MAX_POLL_ATTEMPTS as u64 * POLL_INTERVAL.as_secs()
        )))
    }

    /// `None` while the status endpoint is unavailable; only a garbled
    /// answer ends the polling early.
    async fn poll_status(&self, url: &str) -> Result<Option<dto::AmazonStatusResponse>, FetchError> {
        match http::get_json(self.fetch.as_ref(), url, DEFAULT_TIMEOUT).await {
            Ok(status) => Ok(Some(status)),
            Err(e @ FetchError::Parse(_)) => Err(e),
            Err(e) => {
                tracing::debug!("Status check failed: {}", e);
                Ok(None)
            }
        }
    }
}

/// Configured region first, then the other of `us`/`eu`.
pub fn region_order(configured: &str) -> Vec<String> {
    let configured = configured.trim().to_ascii_lowercase();
    match configured.as_str() {
        "eu" => vec!["eu".to_string(), "us".to_string()],
        _ => vec!["us".to_string(), "eu".to_string()],
    }
}

/// Canonical track URL when the link carries a `trackAsin`.
pub fn normalize_url(url: &str) -> String {
    let asin = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "trackAsin")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    });

    match asin {
        Some(asin) => format!("https://music.amazon.com/tracks/{}?musicTerritory=US", asin),
        None => url.to_string(),
    }
}

/// The finished-job URL may be relative to the service root.
fn resolve_file_url(base_url: &str, url: &str) -> String {
    if let Some(rest) = url.strip_prefix("./") {
        format!("{}/{}", base_url, rest)
    } else if url.starts_with('/') {
        format!("{}{}", base_url, url)
    } else {
        url.to_string()
    }
}

#[async_trait]
impl TrackSource for AmazonSource {
    fn service(&self) -> Service {
        Service::Amazon
    }

    async fn fetch(&self, request: &AcquisitionRequest, dest: &Path) -> Result<(), FetchError> {
        if request.catalog_id.is_empty() {
            return Err(FetchError::MissingIdentifier("catalog id"));
        }

        tracing::info!("Obtaining Amazon URL via song.link");
        let amazon_url = self
            .resolver
            .resolve(&request.catalog_id)
            .await
            .amazon
            .map(|u| normalize_url(&u))
            .ok_or_else(|| FetchError::NotFound("Amazon URL via song.link".into()))?;
        tracing::debug!("+ {}", amazon_url);

        let mut last_error = FetchError::NotFound("no Amazon region answered".into());
        for region in &self.regions {
            tracing::info!("+ Region: {}", region.to_ascii_uppercase());
            match self.try_region(region, &amazon_url, dest).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("Download attempt failed ({}): {}", region, e);
                    if dest.exists() {
                        let _ = std::fs::remove_file(dest);
                    }
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
