//! Per-service acquisition.
//!
//! Each distribution service gets one [`TrackSource`]: given a request and a
//! temp path it either leaves the track's audio at that path or fails.
//! Failures only ever mean "try the next service".

mod amazon;
pub mod dto;
mod qobuz;
mod tidal;

use std::path::Path;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::{AcquisitionRequest, Service};

pub use amazon::AmazonSource;
pub use qobuz::QobuzSource;
pub use tidal::TidalSource;

/// One distribution service.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait TrackSource: Send + Sync {
    fn service(&self) -> Service;

    /// Materialize the request's audio at `dest`.
    ///
    /// Returns [`FetchError::MissingIdentifier`] when the request lacks the
    /// id this service needs.
    async fn fetch(&self, request: &AcquisitionRequest, dest: &Path) -> Result<(), FetchError>;
}

#[cfg(test)]
pub mod mocks {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Shared log of which services were attempted, in order.
    pub type CallLog = Arc<Mutex<Vec<Service>>>;

    /// Mock source that writes fixed bytes or fails.
    pub struct MockSource {
        pub service: Service,
        /// Bytes to write on success
        pub payload: Vec<u8>,
        /// Error to return (takes precedence over payload)
        pub error: Option<FetchError>,
        /// Leave a partial file behind before failing
        pub leave_partial: bool,
        pub log: CallLog,
    }

    impl MockSource {
        pub fn succeeding(service: Service, payload: &[u8], log: CallLog) -> Self {
            Self {
                service,
                payload: payload.to_vec(),
                error: None,
                leave_partial: false,
                log,
            }
        }

        pub fn with_error(service: Service, error: FetchError, log: CallLog) -> Self {
            Self {
                service,
                payload: Vec::new(),
                error: Some(error),
                leave_partial: false,
                log,
            }
        }

        pub fn partial(mut self) -> Self {
            self.leave_partial = true;
            self
        }
    }

    #[async_trait]
    impl TrackSource for MockSource {
        fn service(&self) -> Service {
            self.service
        }

        async fn fetch(&self, _request: &AcquisitionRequest, dest: &Path) -> Result<(), FetchError> {
            self.log.lock().push(self.service);
            if let Some(error) = &self.error {
                if self.leave_partial {
                    std::fs::write(dest, b"partial")?;
                }
                if let FetchError::EncodingFailed(raw) = error {
                    std::fs::write(raw, b"raw container")?;
                }
                return Err(error.clone());
            }
            std::fs::write(dest, &self.payload)?;
            Ok(())
        }
    }
}
