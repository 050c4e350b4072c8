//! Temp-file + rename writes so a failed write never leaves a partial file
//! at the target path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create archive directory", parent, e))?;
    }

    let temp = temp_path(target);

    if let Err(e) = fs::write(&temp, content) {
        let _ = fs::remove_file(&temp);
        return Err(Error::io("write archive temp file", &temp, e));
    }

    if let Err(e) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(Error::io("rename archive temp file", target, e));
    }

    Ok(())
}

// hidden sibling in the same directory so the rename never crosses filesystems
fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.tmp"))
}
