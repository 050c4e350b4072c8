use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, TryLockError};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{ConfigVersion, Device, Ledger, VersionSummary};
use crate::error::{Error, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id INTEGER NOT NULL,
            version_date TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(device_id) REFERENCES devices(id)
        );

        CREATE INDEX IF NOT EXISTS idx_config_versions_device_date
            ON config_versions(device_id, version_date);",
    )
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    // journal_mode answers with a row, so it can't go through execute_batch
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    Ok(())
}

/// SQLite-backed ledger with a small fixed pool of connections.
///
/// Every call checks out one connection for a single statement or a
/// statement pair; nothing holds a connection across files.
#[derive(Debug)]
pub struct SqliteLedger {
    pool: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl SqliteLedger {
    pub fn open(path: &Path, pool_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("create database directory", parent, e))?;
        }

        let pool_size = pool_size.max(1);
        let mut pool = Vec::with_capacity(pool_size);

        for index in 0..pool_size {
            let conn = Connection::open(path).map_err(unavailable)?;
            configure(&conn).map_err(unavailable)?;
            if index == 0 {
                init_schema(&conn)?;
            }
            pool.push(Mutex::new(conn));
        }

        debug!(path = %path.display(), pool_size, "opened ledger");
        Ok(SqliteLedger {
            pool,
            next: AtomicUsize::new(0),
        })
    }

    /// Single-connection in-memory ledger, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;

        Ok(SqliteLedger {
            pool: vec![Mutex::new(conn)],
            next: AtomicUsize::new(0),
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        // prefer an idle connection, otherwise queue on one round-robin
        for slot in &self.pool {
            match slot.try_lock() {
                Ok(conn) => return f(&conn).map_err(Error::from),
                Err(TryLockError::Poisoned(poisoned)) => return f(&poisoned.into_inner()).map_err(Error::from),
                Err(TryLockError::WouldBlock) => continue,
            }
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        let conn = self.pool[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn).map_err(Error::from)
    }
}

fn unavailable(err: rusqlite::Error) -> Error {
    Error::StoreUnavailable {
        attempts: 1,
        reason: err.to_string(),
    }
}

fn encode_time(at: DateTime<Utc>) -> String {
    // fixed width so text order matches time order
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(row: &Row, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn device_from_row(row: &Row) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: decode_time(row, 2)?,
    })
}

fn version_from_row(row: &Row) -> rusqlite::Result<ConfigVersion> {
    Ok(ConfigVersion {
        id: row.get(0)?,
        device_id: row.get(1)?,
        version_date: decode_time(row, 2)?,
        file_path: row.get(3)?,
        file_hash: row.get(4)?,
        created_at: decode_time(row, 5)?,
    })
}

fn summary_from_row(row: &Row) -> rusqlite::Result<VersionSummary> {
    Ok(VersionSummary {
        id: row.get(0)?,
        device_id: row.get(1)?,
        device_name: row.get(2)?,
        version_date: decode_time(row, 3)?,
        file_path: row.get(4)?,
        file_hash: row.get(5)?,
        created_at: decode_time(row, 6)?,
    })
}

const SUMMARY_SELECT: &str =
    "SELECT cv.id, cv.device_id, d.name, cv.version_date, cv.file_path, cv.file_hash, cv.created_at
     FROM config_versions cv
     JOIN devices d ON cv.device_id = d.id";

impl Ledger for SqliteLedger {
    fn get_or_create_device(&self, name: &str) -> Result<Device> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO devices (name, created_at) VALUES (?1, ?2)
                 ON CONFLICT(name) DO NOTHING",
                params![name, encode_time(Utc::now())],
            )?;

            let device = conn.query_row(
                "SELECT id, name, created_at FROM devices WHERE name = ?1",
                params![name],
                device_from_row,
            )?;

            if inserted == 1 {
                info!(device = %device.name, id = device.id, "created device");
            }

            Ok(device)
        })
    }

    fn latest_version(&self, device_id: i64) -> Result<Option<ConfigVersion>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, device_id, version_date, file_path, file_hash, created_at
                 FROM config_versions
                 WHERE device_id = ?1
                 ORDER BY version_date DESC, id DESC
                 LIMIT 1",
                params![device_id],
                version_from_row,
            )
            .optional()
        })
    }

    fn last_recorded_version(&self, device_id: i64) -> Result<Option<ConfigVersion>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, device_id, version_date, file_path, file_hash, created_at
                 FROM config_versions
                 WHERE device_id = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![device_id],
                version_from_row,
            )
            .optional()
        })
    }

    fn insert_version(
        &self,
        device_id: i64,
        version_date: DateTime<Utc>,
        file_path: &str,
        file_hash: &str,
    ) -> Result<ConfigVersion> {
        let created_at = Utc::now();

        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO config_versions (device_id, version_date, file_path, file_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    device_id,
                    encode_time(version_date),
                    file_path,
                    file_hash,
                    encode_time(created_at)
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        info!(device_id, version_id = id, file_path, "saved new version");

        Ok(ConfigVersion {
            id,
            device_id,
            version_date,
            file_path: file_path.to_string(),
            file_hash: file_hash.to_string(),
            created_at,
        })
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, created_at FROM devices ORDER BY id")?;
            let devices = stmt.query_map([], device_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(devices)
        })
    }

    fn device(&self, id: i64) -> Result<Option<Device>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, created_at FROM devices WHERE id = ?1",
                params![id],
                device_from_row,
            )
            .optional()
        })
    }

    fn list_versions(&self) -> Result<Vec<VersionSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SUMMARY_SELECT} ORDER BY cv.created_at DESC, cv.id DESC"
            ))?;
            let versions = stmt.query_map([], summary_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(versions)
        })
    }

    fn device_versions(&self, device_id: i64) -> Result<Vec<VersionSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SUMMARY_SELECT} WHERE cv.device_id = ?1 ORDER BY cv.version_date DESC, cv.id DESC"
            ))?;
            let versions = stmt.query_map(params![device_id], summary_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(versions)
        })
    }

    fn version(&self, id: i64) -> Result<Option<ConfigVersion>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, device_id, version_date, file_path, file_hash, created_at
                 FROM config_versions
                 WHERE id = ?1",
                params![id],
                version_from_row,
            )
            .optional()
        })
    }

    fn ping(&self) -> Result<()> {
        self.with_conn(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .map(|_| ())
            .map_err(|e| match e {
                Error::Store(err) => unavailable(err),
                other => other,
            })
    }
}
