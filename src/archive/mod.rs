//! Content-addressed archive of device configuration snapshots.
//!
//! Layout and path recovery live in submodules:
//! - layout: `<device_id>/<yyyy>/<mm>/<dd>/<sha256>.txt`
//! - atomic: temp→rename writes
//! - resolve: stored ledger path → contained filesystem path

pub mod atomic;
pub mod layout;
pub mod resolve;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hash;

pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Archive { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` for a device and return the path to record in the
    /// ledger (relative to the archive root).
    ///
    /// Repeating a call with the same arguments returns the same path and
    /// leaves the existing file alone. An existing file with different bytes
    /// under the same digest is reported as a conflict and never overwritten.
    pub fn store(&self, device_id: i64, captured_at: DateTime<Utc>, content: &[u8]) -> Result<String> {
        let digest = hash::digest(content);
        let relative = layout::relative_path(device_id, captured_at, &digest);
        let target = self.root.join(&relative);

        match fs::read(&target) {
            Ok(existing) if existing == content => {
                debug!(path = %target.display(), "already archived");
                return Ok(relative);
            }
            Ok(_) => return Err(Error::ArchiveConflict { path: target }),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io("read archived file", &target, e)),
        }

        atomic::atomic_write(&target, content)?;
        info!(device_id, path = %target.display(), bytes = content.len(), "archived snapshot");

        Ok(relative)
    }

    /// Filesystem location for a path recorded in the ledger.
    pub fn resolve(&self, stored: &str) -> Result<PathBuf> {
        resolve::resolve(stored, &self.root)
    }

    pub fn read(&self, stored: &str) -> Result<Vec<u8>> {
        let path = self.resolve(stored)?;
        debug!(stored, resolved = %path.display(), "reading archived file");

        fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::ArchiveMissing { path: path.clone() }
            } else {
                Error::io("read archived file", &path, e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup() -> (Archive, TempDir) {
        let dir = TempDir::new().unwrap();
        (Archive::new(dir.path()), dir)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn store_then_read() {
        let (archive, _dir) = setup();
        let content = b"hostname edge-r1\n";

        let stored = archive.store(4, at(), content).unwrap();

        assert_eq!(stored, format!("4/2025/06/01/{}.txt", hash::digest(content)));
        assert_eq!(archive.read(&stored).unwrap(), content);
    }

    #[test]
    fn repeated_store_is_idempotent() {
        let (archive, _dir) = setup();
        let content = b"interface Gi0/1\n shutdown\n";

        let first = archive.store(1, at(), content).unwrap();
        let second = archive.store(1, at(), content).unwrap();

        assert_eq!(first, second);
        assert_eq!(archive.read(&second).unwrap(), content);
    }

    #[test]
    fn conflicting_content_is_not_overwritten() {
        let (archive, _dir) = setup();
        let content = b"original";
        let stored = archive.store(1, at(), content).unwrap();

        // simulate tampering under the same digest
        let path = archive.resolve(&stored).unwrap();
        fs::write(&path, b"tampered").unwrap();

        let err = archive.store(1, at(), content).unwrap_err();
        assert!(matches!(err, Error::ArchiveConflict { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"tampered");
    }

    #[test]
    fn missing_file_is_not_found() {
        let (archive, _dir) = setup();
        let err = archive.read("9/2025/01/01/deadbeef.txt").unwrap_err();
        assert!(matches!(err, Error::ArchiveMissing { .. }));
    }

    #[test]
    fn unwritable_root_reports_io_error() {
        let (_, dir) = setup();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let archive = Archive::new(&blocker);
        let err = archive.store(1, at(), b"x").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
