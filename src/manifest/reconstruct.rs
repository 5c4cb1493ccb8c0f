//! Materializing a [`StreamSource`] into a single file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Encoder, StreamDescriptor, StreamSource};
use crate::error::FetchError;
use crate::http::Fetch;
use crate::progress::ProgressReporter;

/// Container the DASH segments are appended to: `<dest>.m4a.tmp`.
pub fn container_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".m4a.tmp");
    PathBuf::from(name)
}

/// Where an unconvertible container is kept: `<dest without .flac>.m4a.tmp`.
pub fn raw_container_path(dest: &Path) -> PathBuf {
    let s = dest.to_string_lossy();
    let stem = s.strip_suffix(".flac").unwrap_or(&s);
    PathBuf::from(format!("{}.m4a.tmp", stem))
}

fn label_for(dest: &Path) -> String {
    dest.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Turns stream sources into files.
pub struct Reconstructor {
    fetch: Arc<dyn Fetch>,
    encoder: Encoder,
    progress: Arc<dyn ProgressReporter>,
}

impl Reconstructor {
    pub fn new(fetch: Arc<dyn Fetch>, encoder: Encoder, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            fetch,
            encoder,
            progress,
        }
    }

    /// Write the audio behind `source` to `dest`. Returns bytes written.
    ///
    /// On failure `dest` does not exist. If only the encoder failed, the
    /// downloaded container survives at [`raw_container_path`] and is
    /// reported through [`FetchError::EncodingFailed`].
    pub async fn materialize(&self, source: &StreamSource, dest: &Path) -> Result<u64, FetchError> {
        match source {
            StreamSource::Url(url) => self.download_direct(url, dest).await,
            StreamSource::Manifest(manifest) => match StreamDescriptor::parse(manifest)? {
                StreamDescriptor::Direct {
                    url,
                    mime_type,
                    codecs,
                } => {
                    tracing::info!("Manifest: BTS ({}, {})", mime_type, codecs);
                    self.download_direct(&url, dest).await
                }
                StreamDescriptor::Segmented {
                    init_url,
                    media_urls,
                } => {
                    tracing::info!("Manifest: DASH, {} segments", media_urls.len());
                    self.download_segmented(&init_url, &media_urls, dest).await
                }
            },
        }
    }

    async fn download_direct(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let result = self
            .fetch
            .download_to(url, dest, &label_for(dest), self.progress.as_ref())
            .await;
        if result.is_err() && dest.exists() {
            let _ = std::fs::remove_file(dest);
        }
        result
    }

    async fn download_segmented(
        &self,
        init_url: &str,
        media_urls: &[String],
        dest: &Path,
    ) -> Result<u64, FetchError> {
        let container = container_path(dest);

        let written = match self.write_segments(init_url, media_urls, &container).await {
            Ok(written) => written,
            Err(e) => {
                self.progress.finish();
                let _ = std::fs::remove_file(&container);
                return Err(e);
            }
        };
        tracing::info!("Downloaded {:.2} MB", written as f64 / (1024.0 * 1024.0));

        if let Err(e) = self.encoder.repackage(&container, dest).await {
            tracing::error!("Encoder failed: {}", e);
            if dest.exists() {
                let _ = std::fs::remove_file(dest);
            }
            let raw = raw_container_path(dest);
            std::fs::rename(&container, &raw)?;
            tracing::warn!("Raw stream kept at {}", raw.display());
            return Err(FetchError::EncodingFailed(raw));
        }

        let _ = std::fs::remove_file(&container);
        Ok(std::fs::metadata(dest)?.len())
    }

    /// Init segment first, then every media segment in ascending order.
    async fn write_segments(
        &self,
        init_url: &str,
        media_urls: &[String],
        container: &Path,
    ) -> Result<u64, FetchError> {
        let mut file = std::fs::File::create(container)?;

        self.progress
            .start(&format!("{} (segments)", label_for(container)), None);

        let init = self.fetch.get_bytes(init_url).await?;
        file.write_all(&init)?;
        let mut total = init.len() as u64;
        self.progress.set_total(total);
        self.progress.advance(init.len() as u64);

        for url in media_urls {
            let segment = self.fetch.get_bytes(url).await?;
            file.write_all(&segment)?;
            total += segment.len() as u64;
            self.progress.set_total(total);
            self.progress.advance(segment.len() as u64);
        }

        file.flush()?;
        self.progress.finish();
        Ok(total)
    }
}
