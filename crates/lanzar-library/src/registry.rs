#![forbid(unsafe_code)]

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::error::{LibraryError, LibraryResult};

/// Outcome of sweeping a library root's contents.
///
/// The sweep keeps going past individual failures; each failed path
/// lands here with its error.
#[derive(Debug, Default)]
pub struct CleanupReport {
    failures: Vec<(PathBuf, std::io::Error)>,
}

impl CleanupReport {
    pub fn record(&mut self, path: PathBuf, error: std::io::Error) {
        self.failures.push((path, error));
    }

    /// True when nothing failed to go away.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> &[(PathBuf, std::io::Error)] {
        &self.failures
    }
}

/// Ordered list of library roots, persisted as a JSON array of paths.
///
/// Order is meaningful: installs and lookups walk roots front to back.
/// When the registry file is missing the default root is synthesized in
/// memory; it first reaches disk when a root is explicitly added.
#[derive(Debug, Clone)]
pub struct LibraryRegistry {
    file: PathBuf,
    default_root: PathBuf,
    apps_subdir: String,
}

impl LibraryRegistry {
    pub fn new(file: PathBuf, default_root: PathBuf, apps_subdir: impl Into<String>) -> Self {
        Self {
            file,
            default_root,
            apps_subdir: apps_subdir.into(),
        }
    }

    /// Registered roots, front to back.
    ///
    /// # Errors
    ///
    /// Propagates read and parse failures. A missing file is not a
    /// failure; it yields the default root.
    pub fn list(&self) -> LibraryResult<Vec<PathBuf>> {
        match fs::read(&self.file) {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(default = %self.default_root.display(), "no registry file, using default root");
                Ok(vec![self.default_root.clone()])
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create `<parent>/<apps_subdir>/` and register it as the last root.
    ///
    /// Re-adding an already registered root changes nothing. The full
    /// root list, default included, becomes durable here.
    ///
    /// # Errors
    ///
    /// Propagates directory creation and persistence failures.
    pub fn add(&self, parent: &Path) -> LibraryResult<PathBuf> {
        let root = parent.join(&self.apps_subdir);
        fs::create_dir_all(&root)?;

        let mut roots = self.list()?;
        if roots.contains(&root) {
            debug!(root = %root.display(), "library root already registered");
            return Ok(root);
        }
        roots.push(root.clone());
        self.persist(&roots)?;
        info!(root = %root.display(), "library root added");
        Ok(root)
    }

    /// Delete every installed app under `root`, then deregister it.
    ///
    /// Only subdirectories are swept; stray plain files stay behind.
    /// Failures land in the report without stopping the sweep, and the
    /// root is deregistered regardless of what the report says.
    ///
    /// # Errors
    ///
    /// Propagates registry read and persistence failures. Filesystem
    /// failures during the sweep are reported, not returned.
    pub fn remove(&self, root: &Path) -> LibraryResult<CleanupReport> {
        let mut report = CleanupReport::default();

        match fs::read_dir(root) {
            Ok(entries) => {
                for entry in entries {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            warn!(error = %e, root = %root.display(), "unreadable entry while sweeping library");
                            report.record(root.to_path_buf(), e);
                            continue;
                        }
                    };
                    let path = entry.path();
                    if path.is_dir() {
                        if let Err(e) = fs::remove_dir_all(&path) {
                            warn!(error = %e, path = %path.display(), "could not remove installed app");
                            report.record(path, e);
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, root = %root.display(), "library root unreadable, nothing swept");
                report.record(root.to_path_buf(), e);
            }
        }

        let mut roots = self.list()?;
        roots.retain(|r| r != root);
        self.persist(&roots)?;
        info!(root = %root.display(), clean = report.is_clean(), "library root removed");
        Ok(report)
    }

    /// Whole-file write via temp file and rename, so the registry is
    /// either the old list or the new list, never a torn write.
    fn persist(&self, roots: &[PathBuf]) -> LibraryResult<()> {
        let parent = match self.file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, roots)?;
        tmp.flush()?;
        tmp.persist(&self.file).map_err(|e| LibraryError::Io(e.error))?;
        Ok(())
    }
}
