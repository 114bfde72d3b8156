#![forbid(unsafe_code)]

//! Version markers: one plain-text file per installed app.

use std::path::Path;

use tracing::debug;

use crate::error::LibraryResult;

/// Read the marker for `project_id` under `root`.
///
/// Whitespace is trimmed; a missing, unreadable, or blank marker reads
/// as `None`.
#[must_use]
pub fn read(root: &Path, project_id: &str, marker_name: &str) -> Option<String> {
    let path = root.join(project_id).join(marker_name);
    let raw = std::fs::read_to_string(path).ok()?;
    let version = raw.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

/// Write the marker for `project_id` under `root`.
///
/// # Errors
///
/// Propagates the io error when the app directory is missing or not
/// writable.
pub fn write(root: &Path, project_id: &str, marker_name: &str, version: &str) -> LibraryResult<()> {
    let path = root.join(project_id).join(marker_name);
    std::fs::write(&path, version)?;
    debug!(path = %path.display(), version, "version marker written");
    Ok(())
}
