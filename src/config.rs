//! Configuration system using TOML files.
//!
//! A `tunefetch.toml` in the working directory wins; otherwise the config is
//! stored in the OS-standard config directory:
//! - Windows: %APPDATA%\tunefetch\config.toml
//! - macOS: ~/Library/Application Support/tunefetch/config.toml
//! - Linux: ~/.config/tunefetch/config.toml
//!
//! The config file is human-readable and editable. A default one is written
//! the first time tunefetch runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{Quality, Service};

/// Config file looked up in the working directory first.
pub const LOCAL_CONFIG: &str = "tunefetch.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how files are written
    pub download: DownloadConfig,

    pub tidal: TidalConfig,

    pub qobuz: QobuzConfig,

    pub amazon: AmazonConfig,

    /// Catalog API credentials
    pub spotify: SpotifyConfig,

    /// External programs
    pub tools: ToolsConfig,
}

/// Download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Output root (unset = the user's music directory)
    pub output_dir: Option<PathBuf>,

    /// Subfolder template: {artist}, {album}, {album_artist}, {year}, {service}, {source}
    pub folder_template: String,

    /// Filename template: {title}, {artist}, {album}, {album_artist}, {release_date},
    /// {track}, {track_number}, {position}, {disc_number}, {service}
    pub filename_template: String,

    /// Preferred service
    pub service: Service,

    pub embed_lyrics: bool,

    pub embed_max_quality_cover: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            folder_template: "{album} - {album_artist} - {year} {source}".to_string(),
            filename_template: "{track}. {title} - {artist}".to_string(),
            service: Service::Tidal,
            embed_lyrics: true,
            embed_max_quality_cover: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidalConfig {
    /// Starting tier: HI_RES_LOSSLESS, LOSSLESS or HIGH
    pub quality: Quality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QobuzConfig {
    /// Qobuz format id ("27" = 24-bit hi-res, "6" = CD quality)
    pub quality: String,
}

impl Default for QobuzConfig {
    fn default() -> Self {
        Self {
            quality: "27".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmazonConfig {
    /// Preferred region: US or EU
    pub region: String,
}

impl Default for AmazonConfig {
    fn default() -> Self {
        Self {
            region: "US".to_string(),
        }
    }
}

/// Spotify API credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Pre-issued bearer token (optional)
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// ffmpeg executable (unset = search PATH and common locations)
    pub ffmpeg: Option<String>,
}

impl Config {
    /// Configured output root, or the user's music directory.
    pub fn output_dir(&self) -> PathBuf {
        self.download
            .output_dir
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(default_music_dir)
    }

    pub fn credentials(&self) -> crate::catalog::Credentials {
        crate::catalog::Credentials {
            client_id: self.spotify.client_id.clone(),
            client_secret: self.spotify.client_secret.clone(),
            token: self.spotify.token.clone(),
        }
    }
}

fn default_music_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunefetch"))
}

/// Get the full path to the per-user config file
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// The config file in effect: local file if present, else the per-user one.
pub fn config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    user_config_path()
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed, writing
/// a default file on first run. Logs warnings but doesn't fail - we always
/// return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, writing defaults", path);
        let config = Config::default();
        if let Err(e) = save_to(&path, &config) {
            tracing::warn!("{}", e);
        }
        return config;
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::debug!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load and parse one config file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Save configuration to the per-user config file
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = user_config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(&path, config)?;
    Ok(path)
}

/// Save configuration to `path`
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
