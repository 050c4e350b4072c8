//! Source directory discovery and snapshot loading.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::hash;

/// How a source file name becomes a device name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NamePolicy {
    /// Use the full file name, e.g. `core-sw-01.config`.
    #[default]
    Keep,
    /// Drop the last extension, e.g. `core-sw-01`.
    StripExtension,
}

impl NamePolicy {
    pub fn device_name(&self, file_name: &str) -> String {
        match self {
            NamePolicy::Keep => file_name.to_string(),
            NamePolicy::StripExtension => Path::new(file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(file_name)
                .to_string(),
        }
    }
}

/// One source file, held only while it is being processed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub name: String,
    pub source_path: PathBuf,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub content: Vec<u8>,
    pub hash: String,
}

impl Snapshot {
    pub fn load(path: &Path, policy: NamePolicy) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| Error::io("stat source file", path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| Error::io("read modification time", path, e))?;
        let content = fs::read(path).map_err(|e| Error::io("read source file", path, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Snapshot {
            name: policy.device_name(&file_name),
            source_path: path.to_path_buf(),
            size: content.len() as u64,
            modified_at: DateTime::<Utc>::from(modified),
            hash: hash::digest(&content),
            content,
        })
    }
}

/// Regular files directly inside `dir` whose names end with `suffix`,
/// sorted by file name.
pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(dir).map_err(|e| Error::io("read source directory", dir, e))?;
    if !metadata.is_dir() {
        return Err(Error::io(
            "read source directory",
            dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let matches_suffix = entry
            .file_name()
            .to_str()
            .map(|name| name.ends_with(suffix))
            .unwrap_or(false);
        if !matches_suffix {
            continue;
        }

        // symlinks count when they point at a regular file
        let is_file = entry.file_type().is_file()
            || (entry.file_type().is_symlink() && entry.path().is_file());
        if is_file {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovers_matching_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b-router.config"), "b").unwrap();
        fs::write(dir.path().join("a-switch.config"), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.config")).unwrap();
        fs::write(dir.path().join("nested.config").join("deep.config"), "deep").unwrap();

        let files = discover(dir.path(), "config").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a-switch.config", "b-router.config"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = discover(&dir.path().join("absent"), "config").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path(), "config").unwrap().is_empty());
    }

    #[test]
    fn load_reads_metadata_and_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edge-r1.config");
        fs::write(&path, "hostname edge-r1\n").unwrap();

        let snapshot = Snapshot::load(&path, NamePolicy::Keep).unwrap();

        assert_eq!(snapshot.name, "edge-r1.config");
        assert_eq!(snapshot.size, 17);
        assert_eq!(snapshot.content, b"hostname edge-r1\n");
        assert_eq!(snapshot.hash, hash::digest(b"hostname edge-r1\n"));
    }

    #[test]
    fn size_matches_the_bytes_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edge-r2.config");
        fs::write(&path, "interface Gi0/1\n description é\n").unwrap();

        let snapshot = Snapshot::load(&path, NamePolicy::Keep).unwrap();

        assert_eq!(snapshot.size, snapshot.content.len() as u64);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Snapshot::load(&dir.path().join("gone.config"), NamePolicy::Keep).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn name_policies() {
        assert_eq!(NamePolicy::Keep.device_name("r1.config"), "r1.config");
        assert_eq!(NamePolicy::StripExtension.device_name("r1.config"), "r1");
        assert_eq!(NamePolicy::StripExtension.device_name("r1.backup.config"), "r1.backup");
        assert_eq!(NamePolicy::StripExtension.device_name("running-config"), "running-config");
    }
}
