//! song.link API Data Transfer Objects
//!
//! Only the parts of the `/links` response we read.
//! API Reference: https://odesli.co

use std::collections::HashMap;

use serde::Deserialize;

/// `/v1-alpha.1/links` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksResponse {
    /// Keyed by platform name (`tidal`, `amazonMusic`, `appleMusic`, ...)
    #[serde(default)]
    pub links_by_platform: HashMap<String, PlatformLink>,
}

/// One platform entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformLink {
    #[serde(default)]
    pub url: String,
}
