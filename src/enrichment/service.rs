//! Enrichment service - orchestrates artwork, lyrics and tag writing
//!
//! Runs once per published file:
//! 1. Resolve the Apple Music page for the track (shared song.link resolver)
//! 2. Save archival album artwork next to the file
//! 3. Pick the embedding cover (per-album cache, Apple, then catalog)
//! 4. Optionally fetch lyrics from LRCLIB
//! 5. Write the final tag set

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::cover::CoverCache;
use super::traits::{ArtworkApi, Enrich, LyricsApi};
use crate::error::{Result, ResultExt};
use crate::metadata::{self, TagSet};
use crate::model::AcquisitionRequest;
use crate::resolver::LinkResolver;

/// Archival artwork file written once per album folder.
pub const ALBUM_COVER_FILE: &str = "Album-Cover.png";

/// Archival sizes tried in order.
const ARCHIVAL_SIZES: [u32; 2] = [5000, 3000];
/// Embedded cover size.
const TAG_COVER_SIZE: u32 = 1000;

/// Service for enriching published files
pub struct Enricher {
    resolver: Arc<dyn LinkResolver>,
    artwork: Arc<dyn ArtworkApi>,
    lyrics: Arc<dyn LyricsApi>,
    cache: CoverCache,
}

impl Enricher {
    pub fn new(
        resolver: Arc<dyn LinkResolver>,
        artwork: Arc<dyn ArtworkApi>,
        lyrics: Arc<dyn LyricsApi>,
    ) -> Self {
        Self {
            resolver,
            artwork,
            lyrics,
            cache: CoverCache::new(),
        }
    }

    /// Apple artwork base for the album, remembered alongside the cover.
    async fn apple_base(&mut self, album_key: &str, apple_url: Option<&str>) -> Option<String> {
        if let Some(base) = self.cache.entry(album_key).apple_base.clone() {
            return Some(base);
        }
        let base = self.artwork.apple_artwork_base(apple_url?).await?;
        self.cache.entry(album_key).apple_base = Some(base.clone());
        Some(base)
    }

    async fn archival_cover(
        &mut self,
        album_key: &str,
        apple_url: Option<&str>,
        cover_url: &str,
    ) -> Option<Vec<u8>> {
        if let Some(base) = self.apple_base(album_key, apple_url).await {
            for size in ARCHIVAL_SIZES {
                if let Some(bytes) = self.artwork.apple_artwork(&base, size, "png").await {
                    tracing::info!("Album cover from Apple Music ({}x{})", size, size);
                    return Some(bytes);
                }
            }
        }
        tracing::debug!("Falling back to catalog album cover");
        self.artwork.catalog_artwork(cover_url).await
    }

    async fn tag_cover(
        &mut self,
        album_key: &str,
        apple_url: Option<&str>,
        cover_url: Option<&str>,
    ) -> Option<Vec<u8>> {
        if let Some(cached) = self.cache.get(album_key) {
            tracing::debug!("Reusing cached cover for {}", album_key);
            return Some(cached.to_vec());
        }

        let mut cover = None;
        if let Some(base) = self.apple_base(album_key, apple_url).await {
            cover = self.artwork.apple_artwork(&base, TAG_COVER_SIZE, "jpg").await;
        }
        if cover.is_none()
            && let Some(url) = cover_url
        {
            cover = self.artwork.catalog_artwork(url).await;
        }

        if let Some(ref bytes) = cover {
            self.cache.entry(album_key).cover = Some(bytes.clone());
        }
        cover
    }
}

#[async_trait]
impl Enrich for Enricher {
    async fn enrich(
        &mut self,
        path: &Path,
        request: &AcquisitionRequest,
        folder: &Path,
    ) -> Result<()> {
        let apple_url = if request.catalog_id.is_empty() {
            None
        } else {
            self.resolver.resolve(&request.catalog_id).await.apple
        };
        let album_key = request.album_key();

        if request.playlist.is_none()
            && let Some(ref cover_url) = request.cover_url
        {
            let cover_path = folder.join(ALBUM_COVER_FILE);
            if !cover_path.exists() {
                match self
                    .archival_cover(&album_key, apple_url.as_deref(), cover_url)
                    .await
                {
                    Some(bytes) => {
                        if let Err(e) = std::fs::write(&cover_path, bytes) {
                            tracing::warn!("Failed to save {}: {}", cover_path.display(), e);
                        }
                    }
                    None => tracing::warn!("No album cover available"),
                }
            }
        }

        let mut tags = TagSet::from_request(request);

        if request.embed_max_quality_cover {
            tags.cover = self
                .tag_cover(&album_key, apple_url.as_deref(), request.cover_url.as_deref())
                .await;
        }

        if request.embed_lyrics {
            tracing::info!("Fetching lyrics...");
            tags.lyrics = self.lyrics.lyrics(&request.title, &request.artist).await;
            if tags.lyrics.is_some() {
                tracing::info!("Lyrics found");
            } else {
                tracing::info!("No lyrics found");
            }
        }

        metadata::write_tags(path, &tags).with_context(format!("Failed to tag {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::traits::mocks::{MockArtwork, MockLyrics};
    use crate::resolver::PlatformLinks;
    use crate::resolver::mocks::MockResolver;
    use crate::test_utils::{minimal_flac, sample_request};

    const APPLE_PAGE: &str = "https://music.apple.com/us/album/x/1?i=2";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

    fn apple_links() -> PlatformLinks {
        PlatformLinks {
            apple: Some(APPLE_PAGE.to_string()),
            ..Default::default()
        }
    }

    fn enricher(
        resolver: Arc<MockResolver>,
        artwork: Arc<MockArtwork>,
        lyrics: Arc<MockLyrics>,
    ) -> Enricher {
        Enricher::new(resolver, artwork, lyrics)
    }

    #[tokio::test]
    async fn test_tags_written_with_lyrics_and_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "song.flac");
        let artwork = Arc::new(MockArtwork::apple("https://art/", JPEG));
        let lyrics = Arc::new(MockLyrics::with_lyrics("[00:01.00] la"));
        let mut enricher = enricher(
            Arc::new(MockResolver::with_links(apple_links())),
            artwork.clone(),
            lyrics.clone(),
        );
        let mut req = sample_request();
        req.embed_lyrics = true;
        req.embed_max_quality_cover = true;

        enricher.enrich(&path, &req, dir.path()).await.unwrap();

        assert_eq!(
            metadata::read_isrc(&path).unwrap().as_deref(),
            Some("USUM71703861")
        );
        assert_eq!(lyrics.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(artwork.requests().contains(&"apple:https://art/1000x1000.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_cover_cache_reused_within_album() {
        let dir = tempfile::tempdir().unwrap();
        let first = minimal_flac(dir.path(), "one.flac");
        let second = minimal_flac(dir.path(), "two.flac");
        let resolver = Arc::new(MockResolver::with_links(apple_links()));
        let artwork = Arc::new(MockArtwork::apple("https://art/", JPEG));
        let mut enricher = enricher(resolver, artwork.clone(), Arc::new(MockLyrics::default()));
        let mut req = sample_request();
        req.embed_max_quality_cover = true;

        enricher.enrich(&first, &req, dir.path()).await.unwrap();
        enricher.enrich(&second, &req, dir.path()).await.unwrap();

        let image_requests = artwork
            .requests()
            .iter()
            .filter(|r| !r.starts_with("page:"))
            .count();
        assert_eq!(image_requests, 1);
        let pages = artwork.requests().iter().filter(|r| r.starts_with("page:")).count();
        assert_eq!(pages, 1);
    }

    #[tokio::test]
    async fn test_cover_cache_invalidated_by_new_album() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "one.flac");
        let artwork = Arc::new(MockArtwork::apple("https://art/", JPEG));
        let mut enricher = enricher(
            Arc::new(MockResolver::with_links(apple_links())),
            artwork.clone(),
            Arc::new(MockLyrics::default()),
        );
        let mut req = sample_request();
        req.embed_max_quality_cover = true;

        enricher.enrich(&path, &req, dir.path()).await.unwrap();
        req.album = "Another Album".to_string();
        enricher.enrich(&path, &req, dir.path()).await.unwrap();

        let image_requests = artwork
            .requests()
            .iter()
            .filter(|r| r.starts_with("apple:"))
            .count();
        assert_eq!(image_requests, 2);
    }

    #[tokio::test]
    async fn test_archival_cover_falls_back_through_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "one.flac");
        let artwork = Arc::new(MockArtwork {
            missing_sizes: vec![5000],
            ..MockArtwork::apple("https://art/", JPEG)
        });
        let mut enricher = enricher(
            Arc::new(MockResolver::with_links(apple_links())),
            artwork.clone(),
            Arc::new(MockLyrics::default()),
        );
        let mut req = sample_request();
        req.cover_url = Some("https://i.scdn.co/image/ab67616d0000b273x".into());

        enricher.enrich(&path, &req, dir.path()).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join(ALBUM_COVER_FILE)).unwrap(), JPEG);
        let requests = artwork.requests();
        assert!(requests.contains(&"apple:https://art/5000x5000.png".to_string()));
        assert!(requests.contains(&"apple:https://art/3000x3000.png".to_string()));
        assert!(!requests.iter().any(|r| r.starts_with("catalog:")));
    }

    #[tokio::test]
    async fn test_archival_cover_catalog_fallback_and_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "one.flac");
        let artwork = Arc::new(MockArtwork::catalog_only(&[9, 9, 9]));
        let mut enricher = enricher(
            Arc::new(MockResolver::default()),
            artwork.clone(),
            Arc::new(MockLyrics::default()),
        );
        let mut req = sample_request();
        req.cover_url = Some("https://i.scdn.co/image/cover".into());

        enricher.enrich(&path, &req, dir.path()).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join(ALBUM_COVER_FILE)).unwrap(), vec![9, 9, 9]);

        // Existing archival file is left alone
        enricher.enrich(&path, &req, dir.path()).await.unwrap();
        let catalog = artwork
            .requests()
            .iter()
            .filter(|r| r.starts_with("catalog:"))
            .count();
        assert_eq!(catalog, 1);
    }

    #[tokio::test]
    async fn test_playlist_tracks_skip_archival_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "one.flac");
        let mut enricher = enricher(
            Arc::new(MockResolver::default()),
            Arc::new(MockArtwork::catalog_only(&[1])),
            Arc::new(MockLyrics::default()),
        );
        let mut req = sample_request();
        req.cover_url = Some("https://i.scdn.co/image/cover".into());
        req.playlist = Some("Road Trip".into());

        enricher.enrich(&path, &req, dir.path()).await.unwrap();

        assert!(!dir.path().join(ALBUM_COVER_FILE).exists());
    }

    #[tokio::test]
    async fn test_no_catalog_id_skips_resolver() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "one.flac");
        let resolver = Arc::new(MockResolver::with_links(apple_links()));
        let mut enricher = enricher(
            resolver.clone(),
            Arc::new(MockArtwork::default()),
            Arc::new(MockLyrics::default()),
        );
        let mut req = sample_request();
        req.catalog_id.clear();

        enricher.enrich(&path, &req, dir.path()).await.unwrap();

        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_tag_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-audio.flac");
        std::fs::write(&path, b"text").unwrap();
        let mut enricher = enricher(
            Arc::new(MockResolver::default()),
            Arc::new(MockArtwork::default()),
            Arc::new(MockLyrics::default()),
        );

        assert!(enricher.enrich(&path, &sample_request(), dir.path()).await.is_err());
    }
}
