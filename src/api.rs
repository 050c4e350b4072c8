//! Read-only consumer api over the ledger and the archive tree.
//!
//! Identifiers arrive as strings and are validated before the ledger is
//! touched. Archived content is located through the archive's path
//! resolution, so every lookup goes through the same containment checks.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::archive::Archive;
use crate::diff::DiffReport;
use crate::error::{parse_id, Error, Result};
use crate::ledger::{ConfigVersion, Device, Ledger, VersionSummary};

pub struct ConfigApi {
    ledger: Arc<dyn Ledger>,
    archive: Archive,
}

impl ConfigApi {
    pub fn new(ledger: Arc<dyn Ledger>, archive: Archive) -> Self {
        ConfigApi { ledger, archive }
    }

    pub fn list_devices(&self) -> Result<Vec<Device>> {
        self.ledger.list_devices()
    }

    pub fn device(&self, id: &str) -> Result<Device> {
        let id = parse_id("device id", id)?;
        self.ledger
            .device(id)?
            .ok_or(Error::NotFound { what: "device", id })
    }

    pub fn list_versions(&self) -> Result<Vec<VersionSummary>> {
        self.ledger.list_versions()
    }

    pub fn device_versions(&self, device_id: &str) -> Result<Vec<VersionSummary>> {
        let device = self.device(device_id)?;
        self.ledger.device_versions(device.id)
    }

    pub fn version_content(&self, id: &str) -> Result<String> {
        let id = parse_id("version id", id)?;
        let version = self.version(id)?;
        self.load(&version)
    }

    /// Diff two versions; `left` is usually the older one.
    pub fn version_diff(&self, left: &str, right: &str) -> Result<DiffReport> {
        let left_id = parse_id("version id", left)?;
        let right_id = parse_id("version id", right)?;

        let left_version = self.version(left_id)?;
        let right_version = self.version(right_id)?;

        let left_content = self.load(&left_version)?;
        let right_content = self.load(&right_version)?;

        let report = DiffReport::new(left_id, right_id, left_content, right_content);
        debug!(left_id, right_id, lines = report.lines.len(), "computed diff");
        Ok(report)
    }

    fn version(&self, id: i64) -> Result<ConfigVersion> {
        self.ledger
            .version(id)?
            .ok_or(Error::NotFound { what: "version", id })
    }

    fn load(&self, version: &ConfigVersion) -> Result<String> {
        let bytes = self.archive.read(&version.file_path).map_err(|e| {
            warn!(
                version_id = version.id,
                stored = %version.file_path,
                error = %e,
                "failed to read archived config"
            );
            e
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
