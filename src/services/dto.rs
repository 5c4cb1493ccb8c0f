//! Service API Data Transfer Objects
//!
//! These types match what the download services return, including their
//! historical variations. DO NOT use these types outside the services
//! module - convert to [`StreamSource`](crate::manifest::StreamSource) or
//! plain URLs first.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Tidal stream lookup (`/track/?id=..&quality=..`)
// ---------------------------------------------------------------------------

/// Stream lookup response, V2 (manifest) or V1 (list of URLs)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TidalStreamResponse {
    V2 { data: TidalStreamData },
    V1(Vec<TidalLegacyItem>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TidalStreamData {
    /// Base64 BTS or DASH manifest
    pub manifest: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TidalLegacyItem {
    #[serde(rename = "OriginalTrackUrl")]
    pub original_track_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Amazon download service (`/dl?url=..`, `/dl/{id}`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AmazonSubmitResponse {
    #[serde(default)]
    pub success: bool,
    /// Job id, string or number depending on the instance
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmazonStatusResponse {
    /// `queued`, `processing`, `done` or `error`
    pub status: String,
    /// Relative (`./x`, `/x`) or absolute file URL once done
    pub url: Option<String>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Qobuz search (`/api/get-music`) and download APIs
// ---------------------------------------------------------------------------

/// Search response, wrapped (`{success, data: {tracks}}`) or bare (`{tracks}`)
#[derive(Debug, Clone, Deserialize)]
pub struct QobuzSearchResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<QobuzSearchData>,
    pub tracks: Option<QobuzTrackPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QobuzSearchData {
    pub tracks: Option<QobuzTrackPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QobuzTrackPage {
    #[serde(default)]
    pub items: Vec<QobuzTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QobuzTrack {
    pub id: serde_json::Value,
    pub title: Option<String>,
    pub performer: Option<QobuzPerformer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QobuzPerformer {
    pub name: Option<String>,
}

/// Download API response; each API names the URL differently
#[derive(Debug, Clone, Deserialize)]
pub struct QobuzDownloadResponse {
    pub url: Option<String>,
    pub download_url: Option<String>,
    pub stream_url: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Render a JSON id (string or number) as text.
pub fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
