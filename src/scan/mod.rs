pub mod source;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::archive::Archive;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash;
use crate::ledger::Ledger;
use source::{NamePolicy, Snapshot};

/// Step a file was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Read,
    ResolveDevice,
    LatestVersion,
    Archive,
    Persist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Unchanged {
        device_id: i64,
        hash: String,
    },
    Created {
        device_id: i64,
        version_id: i64,
        file_path: String,
        hash: String,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub discovered: usize,
    pub files: Vec<FileReport>,
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

impl CycleReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Created { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unchanged { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }
}

struct StageError {
    stage: Stage,
    device: Option<String>,
    error: Error,
}

fn at(stage: Stage, device: Option<&str>) -> impl FnOnce(Error) -> StageError + '_ {
    move |error| StageError {
        stage,
        device: device.map(str::to_string),
        error,
    }
}

/// Held for the duration of one cycle; dropping it lets the next one in.
struct CycleGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::CycleInProgress)?;
        Ok(CycleGuard { running })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Change detector. One instance per source directory; cycles on the same
/// instance never overlap.
pub struct Scanner {
    source_dir: PathBuf,
    suffix: String,
    name_policy: NamePolicy,
    archive: Archive,
    ledger: Arc<dyn Ledger>,
    running: AtomicBool,
}

impl Scanner {
    pub fn new(config: &Config, ledger: Arc<dyn Ledger>) -> Self {
        Scanner {
            source_dir: config.source_dir.clone(),
            suffix: config.suffix.clone(),
            name_policy: config.name_policy,
            archive: Archive::new(&config.archive_dir),
            ledger,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// One full pass over the source directory.
    ///
    /// Files are processed one at a time in discovery order. A file that
    /// fails to read or archive is reported and skipped; a ledger failure
    /// aborts the rest of the cycle. Returns `Error::CycleInProgress` right
    /// away when another cycle is still running.
    pub fn run_cycle(&self) -> Result<CycleReport> {
        let _guard = CycleGuard::acquire(&self.running)?;
        let start = std::time::Instant::now();

        let files = source::discover(&self.source_dir, &self.suffix)?;
        let mut report = CycleReport {
            discovered: files.len(),
            ..CycleReport::default()
        };

        if files.is_empty() {
            info!(dir = %self.source_dir.display(), "no config files found");
            report
                .diagnostics
                .push(format!("no files ending in '{}' in {}", self.suffix, self.source_dir.display()));
        } else {
            info!(count = files.len(), "found config file(s)");
        }

        self.process_all(files, &mut report)?;

        report.duration_ms = Some(start.elapsed().as_millis());
        info!(
            created = report.created(),
            unchanged = report.unchanged(),
            failed = report.failed(),
            duration_ms = start.elapsed().as_millis() as u64,
            "scan cycle completed"
        );

        Ok(report)
    }

    fn process_all(&self, files: Vec<PathBuf>, report: &mut CycleReport) -> Result<()> {
        for path in files {
            match self.process_file(&path) {
                Ok((device, outcome)) => report.files.push(FileReport {
                    path,
                    device: Some(device),
                    outcome,
                }),
                Err(failure) if failure.error.is_store_failure() => {
                    error!(
                        path = %path.display(),
                        stage = ?failure.stage,
                        error = %failure.error,
                        "ledger failure, aborting scan cycle"
                    );
                    return Err(failure.error);
                }
                Err(failure) => {
                    warn!(
                        path = %path.display(),
                        stage = ?failure.stage,
                        error = %failure.error,
                        "failed to process file"
                    );
                    report.files.push(FileReport {
                        path,
                        device: failure.device,
                        outcome: FileOutcome::Failed {
                            stage: failure.stage,
                            error: failure.error.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    fn process_file(&self, path: &Path) -> std::result::Result<(String, FileOutcome), StageError> {
        debug!(path = %path.display(), "processing file");

        let snapshot = Snapshot::load(path, self.name_policy).map_err(at(Stage::Read, None))?;
        let name = Some(snapshot.name.as_str());
        debug!(
            device = %snapshot.name,
            size = snapshot.size,
            hash = hash::short(&snapshot.hash),
            "hashed file"
        );

        let device = self
            .ledger
            .get_or_create_device(&snapshot.name)
            .map_err(at(Stage::ResolveDevice, name))?;

        let latest = self
            .ledger
            .last_recorded_version(device.id)
            .map_err(at(Stage::LatestVersion, name))?;

        if let Some(latest) = latest.filter(|v| v.file_hash == snapshot.hash) {
            debug!(device = %device.name, version_id = latest.id, "no changes detected");
            return Ok((
                device.name,
                FileOutcome::Unchanged {
                    device_id: device.id,
                    hash: snapshot.hash,
                },
            ));
        }

        info!(device = %device.name, hash = hash::short(&snapshot.hash), "new or changed config detected");

        // archive before persisting so a ledger row never points at a missing file
        let file_path = self
            .archive
            .store(device.id, snapshot.modified_at, &snapshot.content)
            .map_err(at(Stage::Archive, name))?;

        let version = self
            .ledger
            .insert_version(device.id, snapshot.modified_at, &file_path, &snapshot.hash)
            .map_err(at(Stage::Persist, name))?;

        Ok((
            device.name,
            FileOutcome::Created {
                device_id: device.id,
                version_id: version.id,
                file_path,
                hash: snapshot.hash,
            },
        ))
    }
}
