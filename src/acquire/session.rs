//! Per-process temporary workspace and atomic publishing.
//!
//! Layout: `<output root>/temp_download/session_<token>/`, created on first
//! use and removed when the [`Workspace`] is dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::model::Service;

const TEMP_PARENT: &str = "temp_download";
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LEN: usize = 8;

/// Random lowercase alphanumeric session token.
fn session_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Private temp directory for one process run.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    token: String,
    dir: Option<PathBuf>,
}

impl Workspace {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            root: output_root.into(),
            token: session_token(),
            dir: None,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The session directory, created on first call.
    pub fn dir(&mut self) -> io::Result<&Path> {
        if self.dir.is_none() {
            let dir = self
                .root
                .join(TEMP_PARENT)
                .join(format!("session_{}", self.token));
            fs::create_dir_all(&dir)?;
            tracing::debug!("Created temp workspace {}", dir.display());
            self.dir = Some(dir);
        }
        match self.dir {
            Some(ref dir) => Ok(dir.as_path()),
            None => Err(io::Error::other("temp workspace unavailable")),
        }
    }

    /// `<service>_<epoch seconds>_<filename>` inside the session directory.
    pub fn temp_path(&mut self, service: Service, filename: &str) -> io::Result<PathBuf> {
        let name = format!("{}_{}_{}", service, chrono::Utc::now().timestamp(), filename);
        Ok(self.dir()?.join(name))
    }

    /// Move `temp` to `dest`, creating parent directories.
    ///
    /// Refuses to overwrite an existing destination. When a plain rename is
    /// impossible (different filesystem) the bytes are copied to
    /// `<dest>.part` first and renamed into place.
    pub fn publish(&self, temp: &Path, dest: &Path) -> io::Result<()> {
        if dest.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            ));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Err(e) = fs::rename(temp, dest) {
            tracing::debug!("Rename failed ({}), copying instead", e);
            let mut part = dest.as_os_str().to_owned();
            part.push(".part");
            let part = PathBuf::from(part);

            if let Err(e) = fs::copy(temp, &part).and_then(|_| fs::rename(&part, dest)) {
                let _ = fs::remove_file(&part);
                return Err(e);
            }
            let _ = fs::remove_file(temp);
        }
        Ok(())
    }

    /// Remove a stray temp file, ignoring a missing one.
    pub fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed stray temp file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    /// Remove the session directory and an empty `temp_download` parent.
    pub fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if let Err(e) = fs::remove_dir_all(&dir)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove temp workspace {}: {}", dir.display(), e);
        }
        if let Some(parent) = dir.parent() {
            // Fails while other sessions still have directories there
            let _ = fs::remove_dir(parent);
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_token_shape() {
        let ws = Workspace::new("/unused");
        assert_eq!(ws.token().len(), 8);
        assert!(
            ws.token()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_directory_is_lazy() {
        let root = tempdir().unwrap();
        let mut ws = Workspace::new(root.path());
        assert!(!root.path().join(TEMP_PARENT).exists());

        let dir = ws.dir().unwrap().to_path_buf();
        assert!(dir.is_dir());
        assert_eq!(
            dir,
            root.path()
                .join("temp_download")
                .join(format!("session_{}", ws.token()))
        );
    }

    #[test]
    fn test_temp_path_naming() {
        let root = tempdir().unwrap();
        let mut ws = Workspace::new(root.path());
        let path = ws.temp_path(Service::Qobuz, "Song - Artist.flac").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("qobuz_"));
        assert!(name.ends_with("_Song - Artist.flac"));
        let epoch = name.split('_').nth(1).unwrap();
        assert!(epoch.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn test_drop_removes_workspace() {
        let root = tempdir().unwrap();
        {
            let mut ws = Workspace::new(root.path());
            let temp = ws.temp_path(Service::Tidal, "a.flac").unwrap();
            fs::write(&temp, b"partial").unwrap();
        }
        assert!(!root.path().join(TEMP_PARENT).exists());
    }

    #[test]
    fn test_drop_keeps_shared_parent_in_use() {
        let root = tempdir().unwrap();
        let other = root.path().join(TEMP_PARENT).join("session_other");
        fs::create_dir_all(&other).unwrap();
        {
            let mut ws = Workspace::new(root.path());
            ws.dir().unwrap();
        }
        assert!(other.is_dir());
    }

    #[test]
    fn test_publish_moves_file() {
        let root = tempdir().unwrap();
        let mut ws = Workspace::new(root.path());
        let temp = ws.temp_path(Service::Tidal, "a.flac").unwrap();
        fs::write(&temp, b"audio").unwrap();
        let dest = root.path().join("Artist").join("Album").join("a.flac");

        ws.publish(&temp, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"audio");
        assert!(!temp.exists());
    }

    #[test]
    fn test_publish_refuses_existing_destination() {
        let root = tempdir().unwrap();
        let mut ws = Workspace::new(root.path());
        let temp = ws.temp_path(Service::Tidal, "a.flac").unwrap();
        fs::write(&temp, b"new").unwrap();
        let dest = root.path().join("a.flac");
        fs::write(&dest, b"old").unwrap();

        let err = ws.publish(&temp, &dest).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dest).unwrap(), b"old");
        assert!(temp.exists());
    }

    #[test]
    fn test_discard_is_quiet_for_missing_file() {
        let root = tempdir().unwrap();
        let ws = Workspace::new(root.path());
        let path = root.path().join("stray.flac");
        ws.discard(&path);
        fs::write(&path, b"x").unwrap();
        ws.discard(&path);
        assert!(!path.exists());
    }
}
