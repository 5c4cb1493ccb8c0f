//! Tidal acquisition.
//!
//! catalog id -> song.link -> Tidal track id -> stream lookup on the first
//! answering API host -> manifest or direct URL -> [`Reconstructor`].

use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use super::{TrackSource, dto};
use crate::error::FetchError;
use crate::http::{self, Fetch, STREAM_TIMEOUT};
use crate::manifest::{Reconstructor, StreamSource};
use crate::model::{AcquisitionRequest, Quality, Service};
use crate::resolver::LinkResolver;

pub struct TidalSource {
    fetch: Arc<dyn Fetch>,
    hosts: Vec<String>,
    resolver: Arc<dyn LinkResolver>,
    reconstructor: Arc<Reconstructor>,
}

impl TidalSource {
    pub fn new(
        fetch: Arc<dyn Fetch>,
        hosts: Vec<String>,
        resolver: Arc<dyn LinkResolver>,
        reconstructor: Arc<Reconstructor>,
    ) -> Self {
        Self {
            fetch,
            hosts,
            resolver,
            reconstructor,
        }
    }

    /// Walk the quality chain until some host answers.
    async fn find_stream(&self, track_id: u64, requested: Quality) -> Option<StreamSource> {
        for &quality in requested.fallback_chain() {
            if let Some(source) = self.lookup_stream(track_id, quality).await {
                if quality != requested {
                    tracing::warn!("Quality fallback: {}", quality);
                }
                return Some(source);
            }
        }
        None
    }

    async fn lookup_stream(&self, track_id: u64, quality: Quality) -> Option<StreamSource> {
        for host in &self.hosts {
            let url = format!("{}/track/?id={}&quality={}", host, track_id, quality);
            match http::get_json::<dto::TidalStreamResponse>(self.fetch.as_ref(), &url, STREAM_TIMEOUT).await {
                Ok(response) => {
                    if let Some(source) = stream_source(response) {
                        return Some(source);
                    }
                }
                Err(e) => tracing::debug!("Stream lookup on {} failed: {}", host, e),
            }
        }
        None
    }
}

fn track_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"/track/(\d+)").ok())
        .as_ref()
}

/// Numeric track id from a Tidal URL (`.../track/381170482`).
pub fn track_id(url: &str) -> Option<u64> {
    track_id_pattern()?
        .captures(url)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// V2 carries a manifest, V1 a list where some item has a direct URL.
fn stream_source(response: dto::TidalStreamResponse) -> Option<StreamSource> {
    match response {
        dto::TidalStreamResponse::V2 { data } => Some(StreamSource::Manifest(data.manifest)),
        dto::TidalStreamResponse::V1(items) => items
            .into_iter()
            .find_map(|item| item.original_track_url.filter(|u| !u.is_empty()))
            .map(StreamSource::Url),
    }
}

#[async_trait]
impl TrackSource for TidalSource {
    fn service(&self) -> Service {
        Service::Tidal
    }

    async fn fetch(&self, request: &AcquisitionRequest, dest: &Path) -> Result<(), FetchError> {
        if request.catalog_id.is_empty() {
            return Err(FetchError::MissingIdentifier("catalog id"));
        }

        tracing::info!("Obtaining Tidal URL via song.link");
        let tidal_url = self
            .resolver
            .resolve(&request.catalog_id)
            .await
            .tidal
            .ok_or_else(|| FetchError::NotFound("Tidal URL via song.link".into()))?;
        tracing::debug!("+ {}", tidal_url);

        let id = track_id(&tidal_url)
            .ok_or_else(|| FetchError::Parse(format!("no track id in {}", tidal_url)))?;
        tracing::debug!("+ Track ID: {}", id);

        let source = self
            .find_stream(id, request.quality)
            .await
            .ok_or_else(|| FetchError::NotFound("stream URL from Tidal APIs".into()))?;

        self.reconstructor.materialize(&source, dest).await?;
        Ok(())
    }
}
