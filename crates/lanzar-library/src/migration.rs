#![forbid(unsafe_code)]

//! One-shot backfill of version markers for installs that predate them.

use std::path::PathBuf;

use lanzar_catalog::Catalog;
use tracing::{debug, info, warn};

use crate::markers;

/// Write missing version markers for every install the catalog knows a
/// version for.
///
/// Idempotent: an existing marker is never touched, so repeated runs
/// settle at zero. Individual write failures are logged and skipped.
/// Returns how many markers were written.
pub fn migrate_version_markers(catalog: &Catalog, roots: &[PathBuf], marker_name: &str) -> usize {
    let mut written = 0;

    for project in &catalog.projects {
        let Some(version) = project.remote_version() else {
            continue;
        };
        if project.id.is_empty() || project.executable.is_empty() {
            continue;
        }

        for root in roots {
            let dir = root.join(&project.id);
            if !dir.join(&project.executable).is_file() {
                continue;
            }
            if dir.join(marker_name).exists() {
                continue;
            }
            match markers::write(root, &project.id, marker_name, version) {
                Ok(()) => {
                    debug!(project_id = %project.id, root = %root.display(), version, "marker backfilled");
                    written += 1;
                }
                Err(e) => {
                    warn!(project_id = %project.id, error = %e, "marker backfill failed, skipping");
                }
            }
        }
    }

    if written > 0 {
        info!(written, "version markers migrated");
    }
    written
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use lanzar_catalog::ProjectEntry;
    use tempfile::TempDir;

    use super::*;

    const MARKER: &str = "version.txt";

    fn entry(id: &str, exe: &str, version: Option<&str>) -> ProjectEntry {
        ProjectEntry {
            id: id.into(),
            executable: exe.into(),
            version: version.map(str::to_string),
            ..ProjectEntry::default()
        }
    }

    fn install(root: &Path, id: &str) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("game.exe"), b"bin").unwrap();
    }

    #[test]
    fn backfills_only_unmarked_installs() {
        let root = TempDir::new().unwrap();
        install(root.path(), "alpha");
        install(root.path(), "beta");
        fs::write(root.path().join("beta").join(MARKER), "0.9").unwrap();

        let catalog = Catalog {
            catalog_version: "1".into(),
            projects: vec![
                entry("alpha", "game.exe", Some("1.0")),
                entry("beta", "game.exe", Some("1.0")),
                entry("gamma", "game.exe", Some("1.0")),
            ],
        };
        let roots = vec![root.path().to_path_buf()];

        let written = migrate_version_markers(&catalog, &roots, MARKER);

        assert_eq!(written, 1);
        assert_eq!(markers::read(root.path(), "alpha", MARKER), Some("1.0".into()));
        // The existing marker is left alone.
        assert_eq!(markers::read(root.path(), "beta", MARKER), Some("0.9".into()));
    }

    #[test]
    fn second_run_writes_nothing() {
        let root = TempDir::new().unwrap();
        install(root.path(), "alpha");

        let catalog = Catalog {
            catalog_version: "1".into(),
            projects: vec![entry("alpha", "game.exe", Some("1.0"))],
        };
        let roots = vec![root.path().to_path_buf()];

        assert_eq!(migrate_version_markers(&catalog, &roots, MARKER), 1);
        assert_eq!(migrate_version_markers(&catalog, &roots, MARKER), 0);
    }

    #[test]
    fn unversioned_and_incomplete_entries_are_skipped() {
        let root = TempDir::new().unwrap();
        install(root.path(), "alpha");
        install(root.path(), "beta");

        let catalog = Catalog {
            catalog_version: "1".into(),
            projects: vec![
                entry("alpha", "game.exe", None),
                entry("alpha", "game.exe", Some("   ")),
                entry("", "game.exe", Some("1.0")),
                entry("beta", "", Some("1.0")),
            ],
        };
        let roots = vec![root.path().to_path_buf()];

        assert_eq!(migrate_version_markers(&catalog, &roots, MARKER), 0);
        assert_eq!(markers::read(root.path(), "alpha", MARKER), None);
        assert_eq!(markers::read(root.path(), "beta", MARKER), None);
    }

    #[test]
    fn every_root_hosting_the_app_gets_a_marker() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        install(a.path(), "alpha");
        install(b.path(), "alpha");

        let catalog = Catalog {
            catalog_version: "1".into(),
            projects: vec![entry("alpha", "game.exe", Some("1.0"))],
        };
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        assert_eq!(migrate_version_markers(&catalog, &roots, MARKER), 2);
        assert_eq!(markers::read(a.path(), "alpha", MARKER), Some("1.0".into()));
        assert_eq!(markers::read(b.path(), "alpha", MARKER), Some("1.0".into()));
    }
}
