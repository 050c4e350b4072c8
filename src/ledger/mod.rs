//! Version ledger.
//!
//! Append-only record of device configuration versions with two tables:
//! - devices: id, name (unique), created_at
//! - config_versions: id, device_id, version_date, file_path, file_hash, created_at
//!
//! The scanner only needs get-or-create, latest and insert. The read side is
//! used by the consumer api.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub use sqlite::SqliteLedger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigVersion {
    pub id: i64,
    pub device_id: i64,
    pub version_date: DateTime<Utc>,
    pub file_path: String,
    pub file_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A version joined with the name of its device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSummary {
    pub id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub version_date: DateTime<Utc>,
    pub file_path: String,
    pub file_hash: String,
    pub created_at: DateTime<Utc>,
}

pub trait Ledger: Send + Sync {
    /// Insert-if-absent then fetch, keyed by exact (case-sensitive) name.
    fn get_or_create_device(&self, name: &str) -> Result<Device>;

    /// Most recent version by capture date; `None` when the device has none yet.
    fn latest_version(&self, device_id: i64) -> Result<Option<ConfigVersion>>;

    /// Most recently inserted version, whatever its capture date. This is the
    /// baseline for change detection since file times can move backwards.
    fn last_recorded_version(&self, device_id: i64) -> Result<Option<ConfigVersion>>;

    fn insert_version(
        &self,
        device_id: i64,
        version_date: DateTime<Utc>,
        file_path: &str,
        file_hash: &str,
    ) -> Result<ConfigVersion>;

    fn list_devices(&self) -> Result<Vec<Device>>;

    fn device(&self, id: i64) -> Result<Option<Device>>;

    /// All versions, newest insert first.
    fn list_versions(&self) -> Result<Vec<VersionSummary>>;

    fn device_versions(&self, device_id: i64) -> Result<Vec<VersionSummary>>;

    fn version(&self, id: i64) -> Result<Option<ConfigVersion>>;

    fn ping(&self) -> Result<()>;
}
