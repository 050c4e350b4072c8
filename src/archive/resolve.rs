//! Maps a path recorded in the ledger onto the configured archive root.
//!
//! Rows may carry a relative path (current layout), an absolute path under
//! the root, or an absolute path written by a host that mounted the archive
//! somewhere else. All three resolve to a file inside the root; anything that
//! would land outside it is rejected.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

pub fn resolve(stored: &str, root: &Path) -> Result<PathBuf> {
    let escape = || Error::PathEscape {
        path: PathBuf::from(stored),
    };

    let stored_path = Path::new(stored);
    if stored_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(escape());
    }

    let root = normalize(root);

    let candidate = if stored_path.is_absolute() {
        let normalized = normalize(stored_path);
        if normalized.starts_with(&root) {
            normalized
        } else if let Some(rest) = rest_after_root_name(&normalized, &root) {
            root.join(rest)
        } else {
            match normalized.file_name() {
                Some(name) => root.join(name),
                None => return Err(escape()),
            }
        }
    } else {
        root.join(stored_path)
    };

    let resolved = normalize(&candidate);
    if resolved == root || !resolved.starts_with(&root) {
        return Err(escape());
    }

    Ok(resolved)
}

// drops `.` components; `..` is rejected up front for stored paths
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

// "/old/host/archived_configs/3/x.txt" with root ".../archived_configs"
// yields "3/x.txt"
fn rest_after_root_name(path: &Path, root: &Path) -> Option<PathBuf> {
    let root_name = root.file_name()?;
    let components: Vec<Component> = path.components().collect();
    let position = components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(name) if *name == root_name))?;

    let rest: PathBuf = components[position + 1..].iter().collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}
