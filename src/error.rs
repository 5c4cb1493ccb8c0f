//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror` (catalog and
//! config keep their own), while the CLI/main uses `anyhow` for convenient
//! error propagation.
//!
//! # Design
//!
//! - [`Error`]: Errors of the tagging/enrichment stage
//! - [`FetchError`]: Failures of a single network/service step. These drive
//!   the fallback chain: most of them mean "try the next service", only
//!   [`FetchError::AllServicesExhausted`] is a track failure.
//!
//! # Example
//!
//! ```ignore
//! use tunefetch::error::{Error, Result};
//!
//! fn publish(path: &Path) -> Result<()> {
//!     std::fs::create_dir_all(path)?; // IO errors auto-convert
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag reading/writing error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// A service or pipeline step failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Errors from a single acquisition step.
///
/// `Clone` so mocks can hand out the same failure repeatedly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The service needs an identifier the request does not carry.
    #[error("Missing identifier: {0}")]
    MissingIdentifier(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    /// Connection, timeout or unexpected HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Malformed manifest: {0}")]
    ManifestMalformed(String),

    /// The encoder rejected both the stream copy and the re-encode.
    /// Carries the preserved raw container.
    #[error("Encoder failed, raw stream kept at {}", .0.display())]
    EncodingFailed(PathBuf),

    #[error("IO error: {0}")]
    Io(String),

    #[error("All services exhausted")]
    AllServicesExhausted,
}

impl FetchError {
    /// Whether the failure is worth retrying after a short pause.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, FetchError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Fetch(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::Fetch(FetchError::NotFound("track".into())).context("while resolving");
        let msg = err.to_string();
        assert!(msg.contains("while resolving"));
    }

    #[test]
    fn test_metadata_error() {
        let err = Error::metadata("/music/song.flac", "unsupported format");
        let msg = err.to_string();
        assert!(msg.contains("song.flac"));
        assert!(msg.contains("unsupported format"));
    }

    #[test]
    fn test_encoding_failed_mentions_raw_path() {
        let err = FetchError::EncodingFailed(PathBuf::from("/tmp/x.m4a.tmp"));
        assert!(err.to_string().contains("/tmp/x.m4a.tmp"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Network("timeout".into()).is_transient());
        assert!(FetchError::RateLimited.is_transient());
        assert!(!FetchError::NotFound("x".into()).is_transient());
        assert!(!FetchError::MissingIdentifier("isrc").is_transient());
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), FetchError> = Err(FetchError::RateLimited);
        let with_ctx = result.with_context("song.link");
        assert!(with_ctx.unwrap_err().to_string().contains("song.link"));
    }
}
