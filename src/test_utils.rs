//! Test utilities and fixtures for tunefetch tests.
//!
//! This module provides common test helpers and factories to reduce
//! boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use tunefetch::test_utils::{minimal_flac, sample_request};
//!
//! #[test]
//! fn test_something() {
//!     let dir = tempfile::tempdir().unwrap();
//!     let path = minimal_flac(dir.path(), "song.flac");
//!     let req = sample_request();
//!     // ... test logic
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::model::{AcquisitionRequest, Quality, Service};

/// Bytes of the smallest FLAC file lofty accepts: the `fLaC` marker and a
/// single STREAMINFO block (44.1 kHz, stereo, 16 bit, zero samples).
pub fn minimal_flac_bytes() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(42);
    bytes.extend_from_slice(b"fLaC");
    // Last-metadata-block flag + STREAMINFO, length 34
    bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    // Min/max block size 4096
    bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
    // Min/max frame size unknown
    bytes.extend_from_slice(&[0; 6]);
    // 44100 Hz, 2 channels, 16 bits per sample, start of total samples
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0]);
    // Rest of total samples
    bytes.extend_from_slice(&[0; 4]);
    // MD5 signature
    bytes.extend_from_slice(&[0; 16]);
    bytes
}

/// Writes [`minimal_flac_bytes`] to `dir/name` and returns the path.
pub fn minimal_flac(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, minimal_flac_bytes()).expect("Failed to write FLAC fixture");
    path
}

/// Creates a request with sensible defaults.
///
/// Customize using struct update syntax or by mutating fields:
///
/// ```ignore
/// let req = AcquisitionRequest {
///     service: Service::Qobuz,
///     ..sample_request()
/// };
/// ```
pub fn sample_request() -> AcquisitionRequest {
    AcquisitionRequest {
        catalog_id: "4uLU6hMCjMI75M1A2tKUQC".to_string(),
        isrc: "USUM71703861".to_string(),
        service: Service::Tidal,
        quality: Quality::HiResLossless,
        qobuz_quality: "27".to_string(),
        title: "Test Track".to_string(),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        album_artist: "Test Album Artist".to_string(),
        release_date: "2017-05-26".to_string(),
        track_number: 3,
        disc_number: 1,
        position: 3,
        total_tracks: 12,
        cover_url: None,
        output_dir: PathBuf::from("/tmp/tunefetch-tests"),
        folder_template: String::new(),
        filename_template: "{title} - {artist}".to_string(),
        embed_lyrics: false,
        embed_max_quality_cover: false,
        playlist: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_flac_layout() {
        let bytes = minimal_flac_bytes();
        assert_eq!(bytes.len(), 4 + 4 + 34);
        assert!(bytes.starts_with(b"fLaC"));
    }

    #[test]
    fn test_sample_request_defaults() {
        let req = sample_request();
        assert_eq!(req.service, Service::Tidal);
        assert!(!req.catalog_id.is_empty());
        assert!(!req.isrc.is_empty());
        assert!(req.playlist.is_none());
    }
}
