//! Base URLs of every external service.
//!
//! Production code uses [`Endpoints::default`]; tests point individual
//! entries somewhere else.

/// Endpoint table shared by all clients.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// song.link links API
    pub song_link: String,
    /// Tidal stream lookup hosts, tried in order
    pub tidal_hosts: Vec<String>,
    /// Amazon download service, `{region}` is substituted
    pub amazon_template: String,
    /// Qobuz ISRC search
    pub qobuz_search: String,
    /// Qobuz download-URL APIs, tried in order; the track id is appended
    pub qobuz_download_apis: Vec<String>,
    /// LRCLIB API root
    pub lrclib: String,
    /// Spotify Web API root
    pub spotify_api: String,
    /// Spotify accounts token endpoint
    pub spotify_token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            song_link: "https://api.song.link/v1-alpha.1/links".to_string(),
            tidal_hosts: [
                "vogelf.qqdl.site",
                "maus.qqdl.site",
                "hund.qqdl.site",
                "katze.qqdl.site",
                "wolf.qqdl.site",
                "tidal-api.bininmum.org",
                "triton.squid.wtf",
            ]
            .iter()
            .map(|h| format!("https://{}", h))
            .collect(),
            amazon_template: "https://{region}.doubledouble.top".to_string(),
            qobuz_search: "https://qobuz.squid.wtf/api/get-music".to_string(),
            qobuz_download_apis: vec![
                "https://qobuz.squid.wtf/api/download-music?track_id=".to_string(),
                "https://dab.yeet.su/api/stream?trackId=".to_string(),
                "https://dabmusic.xyz/api/stream?trackId=".to_string(),
            ],
            lrclib: "https://lrclib.net/api".to_string(),
            spotify_api: "https://api.spotify.com/v1".to_string(),
            spotify_token: "https://accounts.spotify.com/api/token".to_string(),
        }
    }
}

impl Endpoints {
    /// Amazon service root for a region (`us`, `eu`).
    pub fn amazon_base(&self, region: &str) -> String {
        self.amazon_template
            .replace("{region}", &region.to_ascii_lowercase())
    }
}
