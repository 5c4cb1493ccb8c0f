//! Post-download enrichment - lyrics, artwork and the final tag set.
//!
//! # Architecture
//!
//! - **Clients** (`lyrics.rs`, `cover.rs`) - HTTP clients for LRCLIB and artwork hosts
//! - **Traits** (`traits.rs`) - seams for mocking the clients and the enricher itself
//! - **Service** (`service.rs`) - orchestrates one file's enrichment and owns the
//!   per-album cover cache
//!
//! Enrichment never reverses a successful acquisition: the orchestrator logs
//! whatever [`Enrich::enrich`] returns.
//!
//! # Usage
//!
//! ```ignore
//! let mut enricher = Enricher::new(resolver, Arc::new(artwork), Arc::new(lyrics));
//! enricher.enrich(&final_path, &request, &folder).await?;
//! ```

pub mod cover;
pub mod lyrics;
pub mod service;
pub mod traits;

pub use cover::{ArtworkClient, CoverCache};
pub use lyrics::LrcLibClient;
pub use service::{ALBUM_COVER_FILE, Enricher};
pub use traits::{ArtworkApi, Enrich, LyricsApi};
