//! Storage layout of the archive tree.
//!
//! Every snapshot lands at `<device_id>/<yyyy>/<mm>/<dd>/<sha256>.txt`
//! relative to the archive root, where the date is the capture time in UTC.
//! The ledger records this relative form.

use chrono::{DateTime, Datelike, Utc};

pub const EXTENSION: &str = "txt";

pub fn relative_path(device_id: i64, captured_at: DateTime<Utc>, digest: &str) -> String {
    format!(
        "{device_id}/{:04}/{:02}/{:02}/{digest}.{EXTENSION}",
        captured_at.year(),
        captured_at.month(),
        captured_at.day()
    )
}
