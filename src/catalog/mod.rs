//! Catalog (Spotify) integration
//!
//! Turns a user-supplied link into the list of tracks to acquire.
//!
//! - **DTOs** (`dto.rs`) - exact Web API response shapes
//! - **Adapter** (`adapter.rs`) - DTO to [`CatalogTrack`] conversion
//! - **Client** (`client.rs`) - authenticated, rate-limit aware HTTP client
//!
//! API docs: https://developer.spotify.com/documentation/web-api

mod adapter;
mod client;
pub mod dto;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

pub use client::{Credentials, SpotifyClient};

/// Errors from catalog lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Not a Spotify track/album/playlist link or ISRC: {0}")]
    InvalidUrl(String),

    #[error("Spotify authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by Spotify")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// What a link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRef {
    Track(String),
    Album(String),
    Playlist(String),
    Isrc(String),
}

fn isrc_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{3}[0-9]{7}$").ok())
        .as_ref()
}

fn typed_ref(kind: &str, id: &str) -> Option<CatalogRef> {
    if id.is_empty() {
        return None;
    }
    let id = id.to_string();
    match kind {
        "track" => Some(CatalogRef::Track(id)),
        "album" => Some(CatalogRef::Album(id)),
        "playlist" => Some(CatalogRef::Playlist(id)),
        _ => None,
    }
}

/// Parse `open.spotify.com/{track|album|playlist}/<id>` links,
/// `spotify:<kind>:<id>` URIs and bare ISRCs.
pub fn parse_url(input: &str) -> Result<CatalogRef, CatalogError> {
    let input = input.trim();
    let upper = input.to_ascii_uppercase();
    if isrc_pattern().is_some_and(|p| p.is_match(&upper)) {
        return Ok(CatalogRef::Isrc(upper));
    }

    if let Some(rest) = input.strip_prefix("spotify:") {
        let mut parts = rest.splitn(2, ':');
        if let (Some(kind), Some(id)) = (parts.next(), parts.next())
            && let Some(reference) = typed_ref(kind, id)
        {
            return Ok(reference);
        }
        return Err(CatalogError::InvalidUrl(input.to_string()));
    }

    let url = reqwest::Url::parse(input).map_err(|_| CatalogError::InvalidUrl(input.to_string()))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    // Locale prefixes such as /intl-de/ come before the kind
    segments
        .windows(2)
        .find_map(|pair| typed_ref(pair[0], pair[1]))
        .ok_or_else(|| CatalogError::InvalidUrl(input.to_string()))
}

/// Album-level fields shared by every track of an album.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogAlbum {
    pub name: String,
    /// Album artists joined with ", "
    pub artist: String,
    pub release_date: String,
    pub cover_url: Option<String>,
    pub total_tracks: u32,
}

/// One track as the catalog describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogTrack {
    /// Empty for ISRC-only requests
    pub id: String,
    pub isrc: String,
    pub title: String,
    /// Track artists joined with ", "
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub release_date: String,
    pub cover_url: Option<String>,
    pub track_number: u32,
    pub disc_number: u32,
    pub total_tracks: u32,
}

impl CatalogTrack {
    pub fn apply_album(&mut self, album: &CatalogAlbum) {
        self.album = album.name.clone();
        self.album_artist = album.artist.clone();
        self.release_date = album.release_date.clone();
        self.cover_url = album.cover_url.clone();
        self.total_tracks = album.total_tracks;
    }

    /// Placeholder for a download requested by ISRC alone.
    pub fn from_isrc(isrc: &str) -> Self {
        Self {
            isrc: isrc.to_string(),
            title: "Unknown".to_string(),
            artist: "Unknown".to_string(),
            track_number: 1,
            disc_number: 1,
            total_tracks: 1,
            ..Default::default()
        }
    }
}

/// Catalog operations used to build a batch.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn track(&self, id: &str) -> Result<CatalogTrack, CatalogError>;
    async fn album(&self, id: &str) -> Result<CatalogAlbum, CatalogError>;
    /// Every track of an album, all pages
    async fn album_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError>;
    async fn playlist_name(&self, id: &str) -> Result<Option<String>, CatalogError>;
    /// Every track of a playlist, all pages
    async fn playlist_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError>;
}

/// Tracks to acquire, in order, plus the playlist they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub tracks: Vec<CatalogTrack>,
    pub playlist: Option<String>,
}

/// Expand a reference into the tracks it names.
pub async fn collect_batch(
    api: &dyn CatalogApi,
    reference: &CatalogRef,
) -> Result<Batch, CatalogError> {
    let batch = match reference {
        CatalogRef::Track(id) => Batch {
            tracks: vec![api.track(id).await?],
            playlist: None,
        },
        CatalogRef::Album(id) => {
            tracing::info!("Fetching album tracks...");
            let mut tracks = api.album_tracks(id).await?;
            match api.album(id).await {
                Ok(album) => {
                    tracing::info!("Album: {} by {}", album.name, album.artist);
                    for track in &mut tracks {
                        track.apply_album(&album);
                    }
                }
                Err(e) => tracing::warn!("Album details unavailable: {}", e),
            }
            // Album listings omit ISRCs
            for track in tracks.iter_mut().filter(|t| t.isrc.is_empty() && !t.id.is_empty()) {
                match api.track(&track.id).await {
                    Ok(full) => track.isrc = full.isrc,
                    Err(e) => tracing::debug!("No ISRC for {}: {}", track.id, e),
                }
            }
            Batch {
                tracks,
                playlist: None,
            }
        }
        CatalogRef::Playlist(id) => {
            tracing::info!("Fetching playlist tracks...");
            let name = match api.playlist_name(id).await {
                Ok(Some(name)) => name,
                Ok(None) => "Playlist".to_string(),
                Err(e) => {
                    tracing::warn!("Playlist details unavailable: {}", e);
                    "Playlist".to_string()
                }
            };
            tracing::info!("Playlist: {}", name);
            Batch {
                tracks: api.playlist_tracks(id).await?,
                playlist: Some(name),
            }
        }
        CatalogRef::Isrc(isrc) => {
            tracing::info!("Downloading by ISRC: {}", isrc);
            Batch {
                tracks: vec![CatalogTrack::from_isrc(isrc)],
                playlist: None,
            }
        }
    };

    if batch.tracks.is_empty() {
        return Err(CatalogError::NotFound("no tracks to download".into()));
    }
    Ok(batch)
}


#[cfg(test)]
mod tests {
    use super::mocks::MockCatalog;
    use super::*;

    fn track(id: &str, isrc: &str) -> CatalogTrack {
        CatalogTrack {
            id: id.to_string(),
            isrc: isrc.to_string(),
            title: format!("Track {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_track_url() {
        assert_eq!(
            parse_url("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc").unwrap(),
            CatalogRef::Track("4uLU6hMCjMI75M1A2tKUQC".into())
        );
    }

    #[test]
    fn test_parse_album_and_playlist_urls() {
        assert_eq!(
            parse_url("https://open.spotify.com/intl-de/album/1DFixLWuPkv3KT3TnV35m3").unwrap(),
            CatalogRef::Album("1DFixLWuPkv3KT3TnV35m3".into())
        );
        assert_eq!(
            parse_url("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M/").unwrap(),
            CatalogRef::Playlist("37i9dQZF1DXcBWIGoYBM5M".into())
        );
    }

    #[test]
    fn test_parse_uri() {
        assert_eq!(
            parse_url("spotify:track:4uLU6hMCjMI75M1A2tKUQC").unwrap(),
            CatalogRef::Track("4uLU6hMCjMI75M1A2tKUQC".into())
        );
        assert!(parse_url("spotify:artist:x").is_err());
    }

    #[test]
    fn test_parse_isrc() {
        assert_eq!(parse_url(" usum71703861 ").unwrap(), CatalogRef::Isrc("USUM71703861".into()));
        assert!(matches!(parse_url("USUM7170386"), Err(CatalogError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_rejects_other_links() {
        assert!(parse_url("https://open.spotify.com/artist/abc").is_err());
        assert!(parse_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_album_batch_fills_album_fields_and_isrcs() {
        let mut catalog = MockCatalog::default();
        let album = CatalogAlbum {
            name: "Record".into(),
            artist: "Band".into(),
            release_date: "2001-02-03".into(),
            cover_url: Some("https://img".into()),
            total_tracks: 2,
        };
        catalog
            .albums
            .insert("alb".into(), (album, vec![track("t1", ""), track("t2", "GBAAA0000002")]));
        catalog.tracks.insert("t1".into(), track("t1", "GBAAA0000001"));

        let batch = collect_batch(&catalog, &CatalogRef::Album("alb".into())).await.unwrap();

        assert_eq!(batch.playlist, None);
        assert_eq!(batch.tracks[0].isrc, "GBAAA0000001");
        assert_eq!(batch.tracks[1].isrc, "GBAAA0000002");
        assert!(batch.tracks.iter().all(|t| t.album == "Record" && t.total_tracks == 2));
        // Only the track without an ISRC needed a full lookup
        assert_eq!(catalog.lookups(), 1);
    }

    #[tokio::test]
    async fn test_playlist_batch_defaults_name() {
        let mut catalog = MockCatalog::default();
        catalog.playlists.insert("pl".into(), (None, vec![track("a", "X")]));

        let batch = collect_batch(&catalog, &CatalogRef::Playlist("pl".into())).await.unwrap();

        assert_eq!(batch.playlist.as_deref(), Some("Playlist"));
        assert_eq!(batch.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_isrc_batch_needs_no_lookup() {
        let catalog = MockCatalog::default();
        let batch = collect_batch(&catalog, &CatalogRef::Isrc("USUM71703861".into()))
            .await
            .unwrap();
        assert_eq!(batch.tracks[0].isrc, "USUM71703861");
        assert!(batch.tracks[0].id.is_empty());
        assert_eq!(catalog.lookups(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_is_an_error() {
        let mut catalog = MockCatalog::default();
        catalog.playlists.insert("pl".into(), (Some("Empty".into()), vec![]));
        let result = collect_batch(&catalog, &CatalogRef::Playlist("pl".into())).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_track_propagates() {
        let catalog = MockCatalog::default();
        let result = collect_batch(&catalog, &CatalogRef::Track("nope".into())).await;
        assert_eq!(result, Err(CatalogError::NotFound("nope".into())));
    }
}
