//! Cross-service link resolution.
//!
//! Given a catalog (Spotify) track id, find the same recording on Tidal,
//! Amazon Music and Apple Music via song.link.

pub mod dto;
mod client;
pub mod rate;

use async_trait::async_trait;

pub use client::SongLinkClient;
pub use rate::{RateBudget, RatePolicy, SharedBudget};

/// Equivalent URLs on other platforms. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformLinks {
    pub tidal: Option<String>,
    pub amazon: Option<String>,
    pub apple: Option<String>,
}

impl PlatformLinks {
    pub fn is_empty(&self) -> bool {
        self.tidal.is_none() && self.amazon.is_none() && self.apple.is_none()
    }
}

impl From<dto::LinksResponse> for PlatformLinks {
    fn from(response: dto::LinksResponse) -> Self {
        let mut by_platform = response.links_by_platform;
        let mut take = |key: &str| {
            by_platform
                .remove(key)
                .map(|link| link.url)
                .filter(|url| !url.is_empty())
        };
        Self {
            tidal: take("tidal"),
            amazon: take("amazonMusic"),
            apple: take("appleMusic"),
        }
    }
}

/// Maps a catalog track id to platform links.
///
/// Never fails: lookup problems yield an empty or partial mapping.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, catalog_id: &str) -> PlatformLinks;
}
