//! Error types shared by the scanner, the archive and the consumer API.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    #[error("archived file not found: {}", path.display())]
    ArchiveMissing { path: PathBuf },

    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store unavailable after {attempts} attempt(s): {reason}")]
    StoreUnavailable { attempts: u32, reason: String },

    #[error("store query failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("invalid {what}: '{value}'. Must be a number.")]
    InvalidId { what: &'static str, value: String },

    #[error("path escapes the archive root: {}", path.display())]
    PathEscape { path: PathBuf },

    #[error("archive conflict: {} exists with different content", path.display())]
    ArchiveConflict { path: PathBuf },

    #[error("a scan cycle is already in progress")]
    CycleInProgress,

    #[error("config error: {message}")]
    Config { message: String },

    #[error("background task failed: {0}")]
    Task(String),
}

/// Coarse classification used to pick exit codes and api responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Io,
    StoreUnavailable,
    Validation,
    Internal,
}

impl Error {
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NotFound { .. } | Error::ArchiveMissing { .. } => ErrorClass::NotFound,
            Error::Io { .. } => ErrorClass::Io,
            Error::StoreUnavailable { .. } => ErrorClass::StoreUnavailable,
            Error::InvalidId { .. } | Error::PathEscape { .. } | Error::Config { .. } => {
                ErrorClass::Validation
            }
            Error::Store(_)
            | Error::ArchiveConflict { .. }
            | Error::CycleInProgress
            | Error::Task(_) => ErrorClass::Internal,
        }
    }

    /// Store failures abort a scan cycle instead of skipping a single file.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Store(_) | Error::StoreUnavailable { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::Validation => 2,
            ErrorClass::NotFound => 3,
            _ => 1,
        }
    }
}

/// Parse an identifier coming from the outside world.
pub fn parse_id(what: &'static str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| Error::InvalidId {
        what,
        value: value.to_string(),
    })
}
