//! Acquisition orchestrator - drives one track from request to tagged file.
//!
//! 1. Compute the destination from the request's templates
//! 2. Skip when the destination already carries the request's ISRC
//! 3. Try each service in fallback order until one materializes a temp file
//! 4. Publish the temp file atomically, then enrich it
//!
//! On total failure nothing is left at the destination; a raw container
//! kept by a failed repackage is moved next to it for manual recovery.

pub mod naming;
pub mod session;

use std::path::{Path, PathBuf};

use crate::enrichment::Enrich;
use crate::error::FetchError;
use crate::manifest;
use crate::metadata;
use crate::model::{AcquisitionRequest, Service, ServiceAttemptResult};
use crate::services::TrackSource;

pub use session::Workspace;

/// Services tried after the requested one.
const FALLBACK: [(Service, [Service; 2]); 3] = [
    (Service::Tidal, [Service::Qobuz, Service::Amazon]),
    (Service::Amazon, [Service::Tidal, Service::Qobuz]),
    (Service::Qobuz, [Service::Tidal, Service::Amazon]),
];

/// Requested service first, then its fallbacks.
pub fn fallback_order(requested: Service) -> Vec<Service> {
    let mut order = vec![requested];
    if let Some((_, rest)) = FALLBACK.iter().find(|(s, _)| *s == requested) {
        order.extend_from_slice(rest);
    }
    order
}

/// What a successful acquisition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Destination already held this recording
    Skipped(PathBuf),
    Downloaded { path: PathBuf, service: Service },
}

impl AcquireOutcome {
    pub fn path(&self) -> &Path {
        match self {
            AcquireOutcome::Skipped(path) => path,
            AcquireOutcome::Downloaded { path, .. } => path,
        }
    }
}

/// One source per service.
pub struct Sources {
    tidal: Box<dyn TrackSource>,
    amazon: Box<dyn TrackSource>,
    qobuz: Box<dyn TrackSource>,
}

impl Sources {
    pub fn new(
        tidal: Box<dyn TrackSource>,
        amazon: Box<dyn TrackSource>,
        qobuz: Box<dyn TrackSource>,
    ) -> Self {
        Self {
            tidal,
            amazon,
            qobuz,
        }
    }

    fn get(&self, service: Service) -> &dyn TrackSource {
        match service {
            Service::Tidal => self.tidal.as_ref(),
            Service::Amazon => self.amazon.as_ref(),
            Service::Qobuz => self.qobuz.as_ref(),
        }
    }
}

/// Acquires tracks one at a time.
pub struct Acquirer {
    sources: Sources,
    enricher: Box<dyn Enrich>,
    workspace: Workspace,
}

impl Acquirer {
    pub fn new(sources: Sources, enricher: Box<dyn Enrich>, workspace: Workspace) -> Self {
        Self {
            sources,
            enricher,
            workspace,
        }
    }

    /// Acquire one track.
    ///
    /// `Err(FetchError::AllServicesExhausted)` means every service failed.
    pub async fn acquire(
        &mut self,
        request: &AcquisitionRequest,
    ) -> Result<AcquireOutcome, FetchError> {
        let (folder, dest) = naming::destination_for(request);
        let filename = naming::filename_for(request);

        if already_present(&dest, &request.isrc) {
            tracing::warn!("Skipping (exists): {}", filename);
            return Ok(AcquireOutcome::Skipped(dest));
        }

        let temp = self.workspace.temp_path(request.service, &filename)?;

        let mut attempt = ServiceAttemptResult::failed(request.service);
        let mut raw_container = None;
        let order = fallback_order(request.service);

        for (i, &service) in order.iter().enumerate() {
            match self.attempt(service, request, &temp).await {
                Ok(()) if temp.exists() => {
                    attempt = ServiceAttemptResult::succeeded(service, temp.clone());
                    break;
                }
                Ok(()) => tracing::warn!("{} reported success but left no file", service),
                Err(FetchError::MissingIdentifier(id)) => {
                    tracing::info!("Skipping {}: no {}", service.abbreviation(), id)
                }
                Err(FetchError::EncodingFailed(raw)) => {
                    tracing::warn!("{} stream could not be repackaged", service.abbreviation());
                    if let Some(previous) = raw_container.replace(raw) {
                        self.workspace.discard(&previous);
                    }
                }
                Err(e) => tracing::warn!("{} failed: {}", service.abbreviation(), e),
            }

            self.workspace.discard(&temp);
            if let Some(next) = order.get(i + 1) {
                tracing::warn!("Trying fallback: {}", next.abbreviation());
            }
        }

        match attempt.temp_path {
            Some(ref temp) if attempt.success => {
                if let Some(raw) = raw_container {
                    self.workspace.discard(&raw);
                }
                self.finish(temp, &dest, &folder, request).await?;
                tracing::info!("Completed: {}", filename);
                Ok(AcquireOutcome::Downloaded {
                    path: dest,
                    service: attempt.service,
                })
            }
            _ => {
                self.workspace.discard(&temp);
                if let Some(raw) = raw_container {
                    self.keep_raw_container(&raw, &dest);
                }
                tracing::error!("Failed to download: {} (all services tried)", request.title);
                Err(FetchError::AllServicesExhausted)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(service = %service))]
    async fn attempt(
        &self,
        service: Service,
        request: &AcquisitionRequest,
        temp: &Path,
    ) -> Result<(), FetchError> {
        let source = self.sources.get(service);
        tracing::info!("Trying {}", source.service().abbreviation());
        source.fetch(request, temp).await
    }

    /// Publish the temp file and enrich the result.
    async fn finish(
        &mut self,
        temp: &Path,
        dest: &Path,
        folder: &Path,
        request: &AcquisitionRequest,
    ) -> Result<(), FetchError> {
        if dest.exists() {
            tracing::info!("Replacing {}", dest.display());
            std::fs::remove_file(dest)?;
        }

        if let Err(e) = self.workspace.publish(temp, dest) {
            self.workspace.discard(temp);
            return Err(e.into());
        }

        if let Err(e) = self.enricher.enrich(dest, request, folder).await {
            tracing::warn!("Metadata enrichment failed: {}", e);
        }
        Ok(())
    }

    fn keep_raw_container(&self, raw: &Path, dest: &Path) {
        let target = manifest::raw_container_path(dest);
        if target.exists() {
            self.workspace.discard(&target);
        }
        match self.workspace.publish(raw, &target) {
            Ok(()) => tracing::warn!("Raw stream kept at {}", target.display()),
            Err(e) => {
                tracing::warn!("Could not keep raw stream: {}", e);
                self.workspace.discard(raw);
            }
        }
    }
}

/// Whether `dest` exists and already carries `isrc`.
fn already_present(dest: &Path, isrc: &str) -> bool {
    if isrc.is_empty() || !dest.exists() {
        return false;
    }
    match metadata::read_isrc(dest) {
        Ok(Some(existing)) if existing == isrc => true,
        Ok(existing) => {
            tracing::debug!(
                "Existing file has ISRC {:?}, expected {}",
                existing,
                isrc
            );
            false
        }
        Err(e) => {
            tracing::debug!("Could not read existing file: {}", e);
            false
        }
    }
}
