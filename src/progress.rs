//! Download progress reporting.
//!
//! The pipeline only talks to [`ProgressReporter`]. The CLI plugs in
//! [`BarProgress`] (an indicatif bar), everything else uses [`NoProgress`].

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

/// Sink for byte/segment progress of one download at a time.
pub trait ProgressReporter: Send + Sync {
    /// Begin a new download. `total` is unknown for chunked responses.
    fn start(&self, label: &str, total: Option<u64>);
    /// Add `delta` to the current position.
    fn advance(&self, delta: u64);
    /// Replace the expected total (segmented downloads grow it as they go).
    fn set_total(&self, total: u64);
    fn finish(&self);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _label: &str, _total: Option<u64>) {}
    fn advance(&self, _delta: u64) {}
    fn set_total(&self, _total: u64) {}
    fn finish(&self) {}
}

/// Terminal progress bar.
#[derive(Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn style(known_total: bool) -> ProgressStyle {
        let template = if known_total {
            "  {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}"
        } else {
            "  {spinner:.green} {msg} {bytes} {bytes_per_sec}"
        };
        ProgressStyle::default_bar()
            .template(template)
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, label: &str, total: Option<u64>) {
        let bar = match total {
            Some(len) if len > 0 => ProgressBar::new(len),
            _ => ProgressBar::new_spinner(),
        };
        bar.set_style(Self::style(total.is_some_and(|len| len > 0)));
        bar.set_message(label.to_string());

        if let Some(previous) = self.bar.lock().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn advance(&self, delta: u64) {
        if let Some(bar) = self.bar.lock().as_ref() {
            bar.inc(delta);
        }
    }

    fn set_total(&self, total: u64) {
        if let Some(bar) = self.bar.lock().as_ref() {
            if bar.length().is_none() {
                bar.set_style(Self::style(true));
            }
            bar.set_length(total);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_and_clear();
        }
    }
}
