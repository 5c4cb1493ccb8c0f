//! Trait definitions for the enrichment collaborators.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real client implementations, while tests
//! can substitute mock implementations.

use std::path::Path;

use async_trait::async_trait;

use crate::model::AcquisitionRequest;

/// Trait for lyrics lookup.
#[async_trait]
pub trait LyricsApi: Send + Sync {
    /// Synced or plain lyrics for a track, if any were found.
    async fn lyrics(&self, title: &str, artist: &str) -> Option<String>;
}

/// Trait for artwork lookup.
///
/// Every method returns `None` on any failure; artwork is best effort.
#[async_trait]
pub trait ArtworkApi: Send + Sync {
    /// Artwork base URL scraped from an Apple Music page.
    async fn apple_artwork_base(&self, page_url: &str) -> Option<String>;

    /// Apple artwork at `size`x`size` in format `ext`.
    async fn apple_artwork(&self, base: &str, size: u32, ext: &str) -> Option<Vec<u8>>;

    /// Catalog artwork at its largest size.
    async fn catalog_artwork(&self, url: &str) -> Option<Vec<u8>>;
}

/// Post-publish enrichment of a final file.
#[async_trait]
pub trait Enrich: Send {
    async fn enrich(
        &mut self,
        path: &Path,
        request: &AcquisitionRequest,
        folder: &Path,
    ) -> crate::error::Result<()>;
}

// Implement traits for real clients

#[async_trait]
impl LyricsApi for super::lyrics::LrcLibClient {
    async fn lyrics(&self, title: &str, artist: &str) -> Option<String> {
        self.fetch_lyrics(title, artist).await
    }
}

#[async_trait]
impl ArtworkApi for super::cover::ArtworkClient {
    async fn apple_artwork_base(&self, page_url: &str) -> Option<String> {
        self.apple_artwork_base(page_url).await
    }

    async fn apple_artwork(&self, base: &str, size: u32, ext: &str) -> Option<Vec<u8>> {
        self.apple_artwork(base, size, ext).await
    }

    async fn catalog_artwork(&self, url: &str) -> Option<Vec<u8>> {
        self.catalog_artwork(url).await
    }
}

/// Mock collaborators for testing.
#[cfg(test)]
pub mod mocks {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Mock lyrics client that returns a fixed answer.
    #[derive(Default)]
    pub struct MockLyrics {
        pub lyrics: Option<String>,
        pub calls: AtomicUsize,
    }

    impl MockLyrics {
        pub fn with_lyrics(lyrics: &str) -> Self {
            Self {
                lyrics: Some(lyrics.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LyricsApi for MockLyrics {
        async fn lyrics(&self, _title: &str, _artist: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.lyrics.clone()
        }
    }

    /// Mock artwork client; records every image URL it is asked for.
    #[derive(Default)]
    pub struct MockArtwork {
        /// Base returned for any page
        pub base: Option<String>,
        /// Apple image bytes, returned for any size not listed in `missing_sizes`
        pub apple: Option<Vec<u8>>,
        pub missing_sizes: Vec<u32>,
        pub catalog: Option<Vec<u8>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockArtwork {
        pub fn apple(base: &str, bytes: &[u8]) -> Self {
            Self {
                base: Some(base.to_string()),
                apple: Some(bytes.to_vec()),
                ..Default::default()
            }
        }

        pub fn catalog_only(bytes: &[u8]) -> Self {
            Self {
                catalog: Some(bytes.to_vec()),
                ..Default::default()
            }
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl ArtworkApi for MockArtwork {
        async fn apple_artwork_base(&self, page_url: &str) -> Option<String> {
            self.requests.lock().push(format!("page:{}", page_url));
            self.base.clone()
        }

        async fn apple_artwork(&self, base: &str, size: u32, ext: &str) -> Option<Vec<u8>> {
            self.requests
                .lock()
                .push(format!("apple:{}{}x{}.{}", base, size, size, ext));
            if self.missing_sizes.contains(&size) {
                return None;
            }
            self.apple.clone()
        }

        async fn catalog_artwork(&self, url: &str) -> Option<Vec<u8>> {
            self.requests.lock().push(format!("catalog:{}", url));
            self.catalog.clone()
        }
    }

    /// Mock enricher counting invocations.
    #[derive(Clone, Default)]
    pub struct MockEnricher {
        pub calls: Arc<AtomicUsize>,
        pub paths: Arc<Mutex<Vec<PathBuf>>>,
        pub fail: bool,
    }

    impl MockEnricher {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Enrich for MockEnricher {
        async fn enrich(
            &mut self,
            path: &Path,
            _request: &AcquisitionRequest,
            _folder: &Path,
        ) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.paths.lock().push(path.to_path_buf());
            if self.fail {
                return Err(crate::error::Error::metadata(path, "tag write failed"));
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_artwork_missing_size() {
            let mock = MockArtwork {
                missing_sizes: vec![5000],
                ..MockArtwork::apple("https://a/", &[1, 2])
            };
            assert!(mock.apple_artwork("https://a/", 5000, "png").await.is_none());
            assert_eq!(mock.apple_artwork("https://a/", 3000, "png").await, Some(vec![1, 2]));
            assert_eq!(mock.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_enricher_counts() {
            let mut mock = MockEnricher::failing();
            let req = crate::test_utils::sample_request();
            assert!(mock.enrich(Path::new("a.flac"), &req, Path::new(".")).await.is_err());
            assert_eq!(mock.count(), 1);
        }
    }
}
