//! The download command: catalog lookup followed by one acquisition per track.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

use crate::acquire::{AcquireOutcome, Acquirer, Sources, Workspace};
use crate::catalog::{self, Batch, CatalogRef, CatalogTrack, SpotifyClient};
use crate::config::Config;
use crate::endpoints::Endpoints;
use crate::enrichment::{ArtworkClient, Enricher, LrcLibClient};
use crate::http::{self, Fetch, HttpFetcher};
use crate::manifest::{Encoder, Reconstructor};
use crate::model::{AcquisitionRequest, Quality, Service};
use crate::progress::{BarProgress, ProgressReporter};
use crate::resolver::{LinkResolver, RateBudget, RatePolicy, SongLinkClient};
use crate::services::{AmazonSource, QobuzSource, TidalSource};

/// Parsed `download` arguments.
#[derive(Debug, Clone)]
pub struct DownloadArgs {
    pub url: String,
    pub service: Option<Service>,
    pub quality: Option<String>,
    pub output: Option<PathBuf>,
    pub lyrics: bool,
    pub cover_max: bool,
}

/// Config merged with command-line overrides.
#[derive(Debug, Clone)]
struct DownloadSettings {
    service: Service,
    quality: Quality,
    qobuz_quality: String,
    output_dir: PathBuf,
    folder_template: String,
    filename_template: String,
    embed_lyrics: bool,
    embed_max_quality_cover: bool,
}

impl DownloadSettings {
    fn resolve(config: &Config, args: &DownloadArgs) -> anyhow::Result<Self> {
        let service = args.service.unwrap_or(config.download.service);
        let mut quality = config.tidal.quality;
        let mut qobuz_quality = config.qobuz.quality.clone();

        if let Some(requested) = args.quality.as_deref() {
            match service {
                Service::Tidal => {
                    quality = requested.parse().map_err(anyhow::Error::msg)?;
                }
                Service::Qobuz => qobuz_quality = requested.to_string(),
                Service::Amazon => warn!("Amazon has no quality setting, ignoring '{}'", requested),
            }
        }

        Ok(Self {
            service,
            quality,
            qobuz_quality,
            output_dir: args.output.clone().unwrap_or_else(|| config.output_dir()),
            folder_template: config.download.folder_template.clone(),
            filename_template: config.download.filename_template.clone(),
            embed_lyrics: config.download.embed_lyrics && args.lyrics,
            embed_max_quality_cover: config.download.embed_max_quality_cover && args.cover_max,
        })
    }

    fn request_for(
        &self,
        track: &CatalogTrack,
        position: u32,
        playlist: Option<&str>,
    ) -> AcquisitionRequest {
        AcquisitionRequest {
            catalog_id: track.id.clone(),
            isrc: track.isrc.clone(),
            service: self.service,
            quality: self.quality,
            qobuz_quality: self.qobuz_quality.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            album_artist: track.album_artist.clone(),
            release_date: track.release_date.clone(),
            track_number: track.track_number,
            disc_number: track.disc_number,
            position,
            total_tracks: track.total_tracks,
            cover_url: track.cover_url.clone(),
            output_dir: self.output_dir.clone(),
            folder_template: self.folder_template.clone(),
            filename_template: self.filename_template.clone(),
            embed_lyrics: self.embed_lyrics,
            embed_max_quality_cover: self.embed_max_quality_cover,
            playlist: playlist.map(String::from),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    success: usize,
    failed: usize,
}

/// Wire the production pipeline together.
fn build_acquirer(config: &Config, client: &reqwest::Client, output_dir: PathBuf) -> Acquirer {
    let endpoints = Endpoints::default();
    let budget = RateBudget::shared(RatePolicy::SONG_LINK);
    let resolver: Arc<dyn LinkResolver> = Arc::new(SongLinkClient::new(
        client.clone(),
        endpoints.song_link.clone(),
        budget,
    ));
    let fetch: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(client.clone()));
    let progress: Arc<dyn ProgressReporter> = Arc::new(BarProgress::new());

    let encoder = Encoder::locate(config.tools.ffmpeg.as_deref());
    if !encoder.is_available() {
        warn!("ffmpeg not found, segmented Tidal streams will be kept as raw .m4a.tmp files");
    }
    let reconstructor = Arc::new(Reconstructor::new(fetch.clone(), encoder, progress.clone()));

    let sources = Sources::new(
        Box::new(TidalSource::new(
            fetch.clone(),
            endpoints.tidal_hosts.clone(),
            resolver.clone(),
            reconstructor,
        )),
        Box::new(AmazonSource::new(
            endpoints.clone(),
            &config.amazon.region,
            resolver.clone(),
            fetch.clone(),
            progress.clone(),
        )),
        Box::new(QobuzSource::new(
            endpoints.qobuz_search.clone(),
            endpoints.qobuz_download_apis.clone(),
            fetch,
            progress,
        )),
    );

    let enricher = Enricher::new(
        resolver,
        Arc::new(ArtworkClient::new(client.clone())),
        Arc::new(LrcLibClient::new(client.clone(), endpoints.lrclib.clone())),
    );

    Acquirer::new(sources, Box::new(enricher), Workspace::new(output_dir))
}

/// Acquire every track of the batch in order.
async fn run_batch(acquirer: &mut Acquirer, batch: &Batch, settings: &DownloadSettings) -> Summary {
    let mut summary = Summary::default();
    let total = batch.tracks.len();

    for (i, track) in batch.tracks.iter().enumerate() {
        info!("Processing: [{}/{}] {} - {}", i + 1, total, track.artist, track.title);
        let request = settings.request_for(track, i as u32 + 1, batch.playlist.as_deref());

        match acquirer.acquire(&request).await {
            Ok(AcquireOutcome::Skipped(path)) => {
                info!("Already downloaded: {}", path.display());
                summary.success += 1;
            }
            Ok(AcquireOutcome::Downloaded { path, service }) => {
                info!("Saved via {}: {}", service, path.display());
                summary.success += 1;
            }
            Err(e) => {
                error!("Failed: {} - {}: {}", track.artist, track.title, e);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Download a track, album or playlist
pub fn cmd_download(rt: &Runtime, config: &Config, args: &DownloadArgs) -> anyhow::Result<()> {
    let reference = catalog::parse_url(&args.url)?;
    let settings = DownloadSettings::resolve(config, args)?;

    let credentials = config.credentials();
    if !credentials.is_configured() && !matches!(reference, CatalogRef::Isrc(_)) {
        anyhow::bail!(
            "Spotify credentials missing: set [spotify] client_id and client_secret (or token) in {}",
            crate::config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| crate::config::LOCAL_CONFIG.to_string())
        );
    }

    rt.block_on(async {
        let client = http::build_client()?;
        let endpoints = Endpoints::default();
        let spotify = SpotifyClient::new(
            client.clone(),
            endpoints.spotify_api,
            endpoints.spotify_token,
            credentials,
        );

        let batch = catalog::collect_batch(&spotify, &reference)
            .await
            .context("Catalog lookup failed")?;
        info!(
            "Found {} track(s), downloading to {}",
            batch.tracks.len(),
            settings.output_dir.display()
        );

        // The acquirer owns the session workspace; dropping it on Ctrl-C removes temp files.
        let mut acquirer = build_acquirer(config, &client, settings.output_dir.clone());
        let summary = tokio::select! {
            summary = run_batch(&mut acquirer, &batch, &settings) => summary,
            _ = tokio::signal::ctrl_c() => {
                anyhow::bail!("Interrupted, temporary files removed");
            }
        };

        println!(
            "Download complete. Success: {}, Failed: {}",
            summary.success, summary.failed
        );
        Ok::<(), anyhow::Error>(())
    })
}
