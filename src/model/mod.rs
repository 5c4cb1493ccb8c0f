//! Core data models for an acquisition.
//!
//! Defines the value types passed between the CLI, the orchestrator and the
//! per-service sources: [`Service`], [`Quality`], [`AcquisitionRequest`] and
//! [`ServiceAttemptResult`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A distribution service audio can be acquired from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Tidal,
    Amazon,
    Qobuz,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Tidal, Service::Amazon, Service::Qobuz];

    /// Lowercase identifier used in temp names and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Tidal => "tidal",
            Service::Amazon => "amazon",
            Service::Qobuz => "qobuz",
        }
    }

    /// Short uppercase tag used in folder names.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Service::Tidal => "TIDAL",
            Service::Amazon => "AMZN",
            Service::Qobuz => "QOBUZ",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tidal" => Ok(Service::Tidal),
            "amazon" | "amzn" => Ok(Service::Amazon),
            "qobuz" => Ok(Service::Qobuz),
            other => Err(format!("unknown service '{}'", other)),
        }
    }
}

/// Tidal quality tier, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    #[default]
    HiResLossless,
    Lossless,
    High,
}

impl Quality {
    const ORDER: [Quality; 3] = [Quality::HiResLossless, Quality::Lossless, Quality::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::HiResLossless => "HI_RES_LOSSLESS",
            Quality::Lossless => "LOSSLESS",
            Quality::High => "HIGH",
        }
    }

    /// This tier followed by every lower tier.
    pub fn fallback_chain(&self) -> &'static [Quality] {
        let start = Self::ORDER.iter().position(|q| q == self).unwrap_or(0);
        &Self::ORDER[start..]
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "HI_RES_LOSSLESS" | "HI_RES" | "HIRES" => Ok(Quality::HiResLossless),
            "LOSSLESS" => Ok(Quality::Lossless),
            "HIGH" => Ok(Quality::High),
            other => Err(format!("unknown quality '{}'", other)),
        }
    }
}

/// Everything needed to acquire and tag one track.
///
/// Built once by the CLI from catalog data and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    /// Catalog (Spotify) track id, may be empty
    pub catalog_id: String,
    /// ISRC, may be empty
    pub isrc: String,
    /// Preferred service, tried first
    pub service: Service,
    pub quality: Quality,
    /// Qobuz quality code ("27" = 24-bit/192kHz, "6" = CD)
    pub qobuz_quality: String,

    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub release_date: String,
    pub track_number: u32,
    pub disc_number: u32,
    /// Position within the listing being downloaded (0 = unknown)
    pub position: u32,
    pub total_tracks: u32,
    /// Catalog cover art URL
    pub cover_url: Option<String>,

    pub output_dir: PathBuf,
    pub folder_template: String,
    pub filename_template: String,

    pub embed_lyrics: bool,
    pub embed_max_quality_cover: bool,
    /// Name of the playlist this track belongs to, if any
    pub playlist: Option<String>,
}

impl AcquisitionRequest {
    /// Key identifying the artwork this track shares with its siblings.
    pub fn album_key(&self) -> String {
        if self.playlist.is_some() {
            format!("playlist-{}", self.catalog_id)
        } else {
            format!("{}-{}", self.album_artist, self.album)
        }
    }

    /// Release year, if the date starts with one.
    pub fn year(&self) -> &str {
        self.release_date.split('-').next().unwrap_or_default()
    }
}

/// Outcome of one candidate service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAttemptResult {
    pub success: bool,
    pub service: Service,
    /// Materialized temp file, on success
    pub temp_path: Option<PathBuf>,
}

impl ServiceAttemptResult {
    pub fn succeeded(service: Service, temp_path: PathBuf) -> Self {
        Self {
            success: true,
            service,
            temp_path: Some(temp_path),
        }
    }

    pub fn failed(service: Service) -> Self {
        Self {
            success: false,
            service,
            temp_path: None,
        }
    }
}
