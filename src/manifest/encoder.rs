//! Repackaging segmented streams with ffmpeg.
//!
//! DASH segments concatenate into a fragmented MP4 container. ffmpeg copies
//! the audio stream out of it into FLAC, or re-encodes when a plain copy is
//! rejected. Nothing else here touches audio.
//!
//! Install ffmpeg:
//! - Windows: `winget install Gyan.FFmpeg`
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt install ffmpeg` or equivalent

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::FetchError;

#[cfg(windows)]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    r"C:\ffmpeg\bin\ffmpeg.exe",
    r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
];

#[cfg(not(windows))]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
];

fn responds_to_version(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Private fallback location, `~/.tunefetch/ffmpeg`.
fn home_fallback() -> Option<PathBuf> {
    let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    dirs::home_dir().map(|home| home.join(".tunefetch").join(name))
}

/// Handle to the external encoder.
#[derive(Debug, Clone)]
pub struct Encoder {
    program: String,
}

impl Encoder {
    /// Use exactly this program.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find a working ffmpeg, preferring the configured path.
    ///
    /// Falls back to plain `ffmpeg` so a later failure names the tool.
    pub fn locate(configured: Option<&str>) -> Self {
        let home = home_fallback().map(|p| p.to_string_lossy().into_owned());
        let found = configured
            .filter(|p| !p.is_empty())
            .into_iter()
            .chain(FFMPEG_PATHS.iter().copied())
            .chain(home.as_deref())
            .find(|p| responds_to_version(p));

        match found {
            Some(program) => Self::with_program(program),
            None => {
                tracing::debug!("ffmpeg not found in any known location");
                Self::with_program("ffmpeg")
            }
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_available(&self) -> bool {
        responds_to_version(&self.program)
    }

    /// First line of `ffmpeg -version` (for diagnostics)
    pub fn version(&self) -> Option<String> {
        let output = std::process::Command::new(&self.program)
            .arg("-version")
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|l| l.trim().to_string())
    }

    /// Move the audio of `input` into `output`.
    ///
    /// Tries a stream copy first, then a FLAC re-encode.
    pub async fn repackage(&self, input: &Path, output: &Path) -> Result<(), FetchError> {
        match self.run(input, output, "copy").await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!("Stream copy failed ({}), re-encoding to FLAC", e);
                self.run(input, output, "flac").await
            }
        }
    }

    async fn run(&self, input: &Path, output: &Path, codec: &str) -> Result<(), FetchError> {
        let result = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-vn", "-c:a", codec])
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| FetchError::Io(format!("Failed to run {}: {}", self.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last = stderr.lines().last().unwrap_or("").trim();
            return Err(FetchError::Io(format!("{} failed: {}", self.program, last)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_unavailable() {
        let encoder = Encoder::with_program("/nonexistent/ffmpeg-for-tests");
        assert!(!encoder.is_available());
        assert!(encoder.version().is_none());
    }

    #[test]
    fn test_locate_skips_broken_configured_path() {
        let encoder = Encoder::locate(Some("/nonexistent/ffmpeg-for-tests"));
        assert_ne!(encoder.program(), "/nonexistent/ffmpeg-for-tests");
    }

    #[tokio::test]
    async fn test_repackage_with_missing_program_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.m4a.tmp");
        std::fs::write(&input, b"not really mp4").unwrap();
        let encoder = Encoder::with_program("/nonexistent/ffmpeg-for-tests");
        let result = encoder.repackage(&input, &dir.path().join("out.flac")).await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
