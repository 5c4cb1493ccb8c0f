//! Spotify Web API response shapes.
//!
//! Only the fields tunefetch reads are modelled; everything is optional or
//! defaulted because album-track listings omit `album` and `external_ids`.

use serde::Deserialize;

/// `POST /api/token` (client credentials)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    pub isrc: Option<String>,
}

/// `GET /albums/{id}` and the `album` object embedded in tracks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub total_tracks: u32,
}

/// `GET /tracks/{id}`; also the items of album and playlist listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Track {
    /// Missing for local files in playlists
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    pub external_ids: Option<ExternalIds>,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub disc_number: u32,
}

/// One page of a listing; `next` is the absolute URL of the following page.
#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Entry of `GET /playlists/{id}/tracks`
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<Track>,
}

/// `GET /playlists/{id}?fields=name`
#[derive(Debug, Deserialize)]
pub struct Playlist {
    pub name: Option<String>,
}
