//! Durable session marker.
//!
//! The marker is a small JSON file holding the last credential so a restart
//! can restore the session by refreshing it. It is written on sign-in and on
//! every token refresh, and removed on sign-out or termination. Failures to
//! read or write are logged and otherwise ignored: the worst case is a fresh
//! sign-in.

use std::path::{Path, PathBuf};

use tracing::warn;

use super::IdentityCredential;

#[derive(Debug, Clone)]
pub struct SessionMarker {
    path: PathBuf,
}

impl SessionMarker {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last saved credential, if the file exists and parses.
    #[must_use]
    pub fn load(&self) -> Option<IdentityCredential> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "session marker read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "session marker corrupt; ignoring");
                None
            }
        }
    }

    pub fn save(&self, credential: &IdentityCredential) {
        let json = match serde_json::to_string(credential) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "session marker encode failed");
                return;
            }
        };
        if let Err(e) = write_private(&self.path, &json) {
            warn!(error = %e, path = %self.path.display(), "session marker write failed");
        }
    }

    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "session marker remove failed"),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
