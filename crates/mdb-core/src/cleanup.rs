//! Stale-file janitor for bot-owned storage directories.

use std::{
    fs,
    io::ErrorKind,
    path::Path,
    time::{Duration, SystemTime},
};

use crate::Result;

/// Delete regular files in `dir` whose modification time is at least
/// `older_than` in the past. Returns the number of files removed.
///
/// Subdirectories are left alone and a missing directory counts as nothing
/// to do.
pub fn sweep_stale_files(dir: &Path, older_than: Duration) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = 0usize;

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        // A modification time in the future never qualifies as stale.
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age < older_than {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("janitor could not remove {}: {e}", path.display()),
        }
    }

    Ok(removed)
}
