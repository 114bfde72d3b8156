#![forbid(unsafe_code)]

//! Install state: where an app's executable lives and which version the
//! on-disk marker claims.

use std::path::PathBuf;

use lanzar_catalog::ProjectEntry;

use crate::markers;

/// Where a project stands across the registered library roots.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallState {
    /// No root holds the project's executable.
    NotInstalled,
    /// Executable found; `version` is the marker value when one exists.
    Installed {
        exe_path: PathBuf,
        version: Option<String>,
    },
    /// Executable found but the marker disagrees with the catalog.
    UpdateAvailable {
        exe_path: PathBuf,
        installed: String,
        remote: String,
    },
}

/// Resolve `project` against `roots`, front to back, with live
/// filesystem checks on every call.
///
/// The executable and the marker are looked up independently, each
/// taken from the first root that has it. Version strings are compared
/// by plain inequality; any difference from the catalog counts as an
/// update, downgrades included.
#[must_use]
pub fn resolve(project: &ProjectEntry, roots: &[PathBuf], marker_name: &str) -> InstallState {
    if project.id.is_empty() {
        return InstallState::NotInstalled;
    }

    let exe_path = roots
        .iter()
        .map(|root| root.join(&project.id).join(&project.executable))
        .find(|candidate| candidate.is_file());

    let Some(exe_path) = exe_path else {
        return InstallState::NotInstalled;
    };

    let installed = roots
        .iter()
        .find_map(|root| markers::read(root, &project.id, marker_name));

    match (installed, project.remote_version()) {
        (Some(installed), Some(remote)) if installed != remote => InstallState::UpdateAvailable {
            exe_path,
            installed,
            remote: remote.to_string(),
        },
        (installed, _) => InstallState::Installed {
            exe_path,
            version: installed,
        },
    }
}

/// First root whose directory for `project_id` exists, front to back.
#[must_use]
pub fn installed_root(project_id: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    if project_id.is_empty() {
        return None;
    }
    roots
        .iter()
        .find(|root| root.join(project_id).is_dir())
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    const MARKER: &str = "version.txt";

    fn project(id: &str, exe: &str, version: Option<&str>) -> ProjectEntry {
        ProjectEntry {
            id: id.into(),
            executable: exe.into(),
            version: version.map(str::to_string),
            ..ProjectEntry::default()
        }
    }

    fn install(root: &Path, id: &str, exe: &str) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(exe), b"bin").unwrap();
    }

    fn mark(root: &Path, id: &str, version: &str) {
        fs::write(root.join(id).join(MARKER), version).unwrap();
    }

    #[test]
    fn absent_everywhere_is_not_installed() {
        let a = TempDir::new().unwrap();
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", None), &roots, MARKER);

        assert_eq!(state, InstallState::NotInstalled);
    }

    #[test]
    fn empty_project_id_is_never_installed() {
        let a = TempDir::new().unwrap();
        // A directory with an empty-string name cannot exist, but guard
        // against "<root>/<exe>" accidentally matching.
        fs::write(a.path().join("game.exe"), b"bin").unwrap();
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("", "game.exe", None), &roots, MARKER);

        assert_eq!(state, InstallState::NotInstalled);
    }

    #[test]
    fn first_root_wins_for_the_executable() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        install(a.path(), "demo", "game.exe");
        install(b.path(), "demo", "game.exe");
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", None), &roots, MARKER);

        match state {
            InstallState::Installed { exe_path, version } => {
                assert!(exe_path.starts_with(a.path()));
                assert_eq!(version, None);
            }
            other => panic!("expected Installed, got {other:?}"),
        }
    }

    #[test]
    fn marker_is_found_independently_of_the_executable() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        // Executable lives in the first root, marker in the second.
        install(a.path(), "demo", "game.exe");
        fs::create_dir_all(b.path().join("demo")).unwrap();
        fs::write(b.path().join("demo").join(MARKER), "1.0").unwrap();
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", Some("1.0")), &roots, MARKER);

        assert_eq!(
            state,
            InstallState::Installed {
                exe_path: a.path().join("demo").join("game.exe"),
                version: Some("1.0".into()),
            }
        );
    }

    #[test]
    fn version_mismatch_means_update_available() {
        let a = TempDir::new().unwrap();
        install(a.path(), "demo", "game.exe");
        mark(a.path(), "demo", "1.0");
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", Some("2.0")), &roots, MARKER);

        assert_eq!(
            state,
            InstallState::UpdateAvailable {
                exe_path: a.path().join("demo").join("game.exe"),
                installed: "1.0".into(),
                remote: "2.0".into(),
            }
        );
    }

    #[test]
    fn downgrade_also_counts_as_update() {
        let a = TempDir::new().unwrap();
        install(a.path(), "demo", "game.exe");
        mark(a.path(), "demo", "2.0");
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", Some("1.0")), &roots, MARKER);

        assert!(matches!(state, InstallState::UpdateAvailable { .. }));
    }

    #[test]
    fn matching_versions_stay_installed() {
        let a = TempDir::new().unwrap();
        install(a.path(), "demo", "game.exe");
        mark(a.path(), "demo", "1.0");
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", Some("1.0")), &roots, MARKER);

        assert_eq!(
            state,
            InstallState::Installed {
                exe_path: a.path().join("demo").join("game.exe"),
                version: Some("1.0".into()),
            }
        );
    }

    #[test]
    fn no_marker_is_installed_even_with_a_remote_version() {
        let a = TempDir::new().unwrap();
        install(a.path(), "demo", "game.exe");
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", Some("2.0")), &roots, MARKER);

        assert_eq!(
            state,
            InstallState::Installed {
                exe_path: a.path().join("demo").join("game.exe"),
                version: None,
            }
        );
    }

    #[test]
    fn no_remote_version_never_updates() {
        let a = TempDir::new().unwrap();
        install(a.path(), "demo", "game.exe");
        mark(a.path(), "demo", "1.0");
        let roots = vec![a.path().to_path_buf()];

        let state = resolve(&project("demo", "game.exe", None), &roots, MARKER);

        assert!(matches!(state, InstallState::Installed { .. }));
    }

    #[test]
    fn installed_root_takes_the_first_match() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::create_dir_all(b.path().join("demo")).unwrap();
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        assert_eq!(
            installed_root("demo", &roots),
            Some(b.path().to_path_buf())
        );
        assert_eq!(installed_root("other", &roots), None);
        assert_eq!(installed_root("", &roots), None);
    }
}
