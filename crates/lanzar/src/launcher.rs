#![forbid(unsafe_code)]

//! The launcher: wired components behind one handle.

use std::path::{Path, PathBuf};

use lanzar_catalog::{Catalog, CatalogCache, ImageCache, ProjectEntry};
use lanzar_events::{Event, EventBus, InstallEvent, InstallFailure, ProcessEvent};
use lanzar_install::{Installer, StartOutcome};
use lanzar_library::{
    CleanupReport, InstallState, LibraryRegistry, installed_root, markers,
    migrate_version_markers, resolve,
};
use lanzar_net::HttpClient;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::{LauncherConfig, LauncherPaths},
    error::{LauncherError, LauncherResult},
    selfupdate::{self, UpdateInfo},
};

// -- InstallOutcome -----------------------------------------------------------

/// How a driven install ended. Failures other than cancellation are
/// reported as [`LauncherError::InstallFailed`].
#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    /// The app is installed; its executable is at this path.
    Completed(PathBuf),
    /// The session was cancelled before it finished.
    Cancelled,
    /// A session for the same project was already running; nothing was
    /// started.
    AlreadyActive,
}

// -- Launcher -----------------------------------------------------------------

/// Install/update lifecycle engine of a desktop app launcher.
///
/// Owns the catalog cache, the library registry, the install engine,
/// and the event bus they publish on. Construction is cheap and does no
/// I/O; every filesystem or network touch happens inside the operation
/// that needs it.
///
/// # Example
///
/// ```ignore
/// use lanzar::{Launcher, LauncherConfig};
///
/// let launcher = Launcher::new(LauncherConfig::new(catalog_url, data_dir));
/// let catalog = launcher.catalog().await?;
/// ```
pub struct Launcher {
    paths: LauncherPaths,
    update_url: Option<Url>,
    net: HttpClient,
    bus: EventBus,
    catalog: CatalogCache,
    images: ImageCache,
    registry: LibraryRegistry,
    installer: Installer,
    shutdown: CancellationToken,
}

impl Launcher {
    /// Wire a launcher from `config`.
    ///
    /// # Panics
    ///
    /// Panics when the HTTP client cannot be built (see
    /// [`HttpClient::new`]).
    #[must_use]
    pub fn new(config: LauncherConfig) -> Self {
        let net = HttpClient::new(config.net);
        let bus = EventBus::new(config.event_capacity);
        let shutdown = config.cancel.unwrap_or_default();

        let catalog = CatalogCache::new(
            net.clone(),
            config.catalog_url,
            config.paths.catalog_cache_file.clone(),
        );
        let images = ImageCache::new(net.clone(), config.paths.image_cache_dir.clone());
        let registry = LibraryRegistry::new(
            config.paths.libraries_file.clone(),
            config.paths.default_install_dir.clone(),
            config.paths.apps_subdir.clone(),
        );
        let installer = Installer::new(net.clone(), bus.clone(), shutdown.clone());

        Self {
            paths: config.paths,
            update_url: config.update_url,
            net,
            bus,
            catalog,
            images,
            registry,
            installer,
            shutdown,
        }
    }

    /// Subscribe to install and process events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The bus every component publishes on.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Filesystem layout this launcher was built with.
    #[must_use]
    pub fn paths(&self) -> &LauncherPaths {
        &self.paths
    }

    // -- Catalog --------------------------------------------------------------

    /// Load the catalog, remote copy first, cached copy as fallback.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`](lanzar_catalog::CatalogError)
    /// when neither source can be read.
    pub async fn catalog(&self) -> LauncherResult<Catalog> {
        Ok(self.catalog.load().await?)
    }

    /// Local path of the project's cover image, fetching it on a miss.
    ///
    /// `Ok(None)` when the entry has no usable cover URL.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures; a cached copy never fails.
    pub async fn cover_image(&self, project: &ProjectEntry) -> LauncherResult<Option<PathBuf>> {
        self.image(&project.id, project.cover_url.as_deref()).await
    }

    /// Local path of the project's icon, fetching it on a miss.
    ///
    /// `Ok(None)` when the entry has no usable icon URL.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures; a cached copy never fails.
    pub async fn icon_image(&self, project: &ProjectEntry) -> LauncherResult<Option<PathBuf>> {
        let key = format!("{}_icon", project.id);
        self.image(&key, project.icon_url.as_deref()).await
    }

    async fn image(&self, key: &str, url: Option<&str>) -> LauncherResult<Option<PathBuf>> {
        let Some(raw) = url.filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };
        let Ok(url) = Url::parse(raw) else {
            warn!(key, url = raw, "unusable image URL");
            return Ok(None);
        };
        Ok(Some(self.images.fetch(key, &url).await?))
    }

    // -- Libraries ------------------------------------------------------------

    /// Library roots in registry order.
    ///
    /// # Errors
    ///
    /// Propagates [`LibraryError`](lanzar_library::LibraryError) on an
    /// unreadable or corrupt registry file.
    pub fn libraries(&self) -> LauncherResult<Vec<PathBuf>> {
        Ok(self.registry.list()?)
    }

    /// Register `<parent>/<apps_subdir>/` as a new library root.
    ///
    /// # Errors
    ///
    /// Propagates [`LibraryError`](lanzar_library::LibraryError) when the
    /// directory cannot be created or the registry cannot be persisted.
    pub fn add_library(&self, parent: &Path) -> LauncherResult<PathBuf> {
        Ok(self.registry.add(parent)?)
    }

    /// Deregister `root`, sweeping its app subdirectories best-effort.
    ///
    /// # Errors
    ///
    /// Propagates [`LibraryError`](lanzar_library::LibraryError) when the
    /// registry cannot be persisted. Individual deletion failures land in
    /// the returned [`CleanupReport`] instead.
    pub fn remove_library(&self, root: &Path) -> LauncherResult<CleanupReport> {
        Ok(self.registry.remove(root)?)
    }

    // -- Install state --------------------------------------------------------

    /// Resolve the project's install state from the live filesystem.
    ///
    /// # Errors
    ///
    /// Propagates [`LibraryError`](lanzar_library::LibraryError) on an
    /// unreadable registry file.
    pub fn status(&self, project: &ProjectEntry) -> LauncherResult<InstallState> {
        let roots = self.registry.list()?;
        Ok(resolve(project, &roots, &self.paths.marker_filename))
    }

    // -- Install --------------------------------------------------------------

    /// Install or update `project` and wait for the outcome.
    ///
    /// Updates reuse the root the app already lives in; fresh installs go
    /// to the first registry root. On `Completed` the catalog version is
    /// written to the app's marker before this returns; a marker write
    /// failure only warns, since the next migration pass repairs it.
    ///
    /// # Errors
    ///
    /// [`LauncherError::Install`] for an invalid entry,
    /// [`LauncherError::InstallFailed`] when the session ends in a
    /// failure other than cancellation.
    pub async fn install(&self, project: &ProjectEntry) -> LauncherResult<InstallOutcome> {
        let target_root = self.target_root(&project.id)?;

        // Subscribe before starting so the terminal event cannot be missed.
        let mut rx = self.bus.subscribe();
        if self.installer.start(project, &target_root)? == StartOutcome::AlreadyActive {
            return Ok(InstallOutcome::AlreadyActive);
        }

        let outcome = loop {
            let event = match rx.recv().await {
                Ok(Event::Install(event)) if event.project_id() == project.id => event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event bus lagged while driving an install");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(LauncherError::EventsClosed {
                        project_id: project.id.clone(),
                    });
                }
            };

            match event {
                InstallEvent::Completed { exe_path, .. } => {
                    self.record_version(project, &target_root);
                    break Ok(InstallOutcome::Completed(exe_path));
                }
                InstallEvent::Failed {
                    reason: InstallFailure::Cancelled,
                    ..
                } => break Ok(InstallOutcome::Cancelled),
                InstallEvent::Failed { reason, .. } => {
                    break Err(LauncherError::InstallFailed(reason));
                }
                InstallEvent::Progress { .. } | InstallEvent::Extracting { .. } => {}
            }
        };

        // The slot outlives the terminal event by a moment; wait it out
        // so the caller can uninstall or reinstall right away.
        self.installer.wait(&project.id).await;
        outcome
    }

    /// Request cancellation of the live session for `project_id`.
    /// Returns whether one was there to cancel.
    pub fn cancel_install(&self, project_id: &str) -> bool {
        self.installer.cancel(project_id)
    }

    /// Wait until no session holds the slot for `project_id`.
    pub async fn wait_install(&self, project_id: &str) {
        self.installer.wait(project_id).await;
    }

    /// True while an install session for `project_id` is running.
    #[must_use]
    pub fn is_installing(&self, project_id: &str) -> bool {
        self.installer.is_active(project_id)
    }

    fn target_root(&self, project_id: &str) -> LauncherResult<PathBuf> {
        let roots = self.registry.list()?;
        Ok(installed_root(project_id, &roots)
            .or_else(|| roots.first().cloned())
            .unwrap_or_else(|| self.paths.default_install_dir.clone()))
    }

    fn record_version(&self, project: &ProjectEntry, root: &Path) {
        let Some(version) = project.remote_version() else {
            return;
        };
        if let Err(e) = markers::write(root, &project.id, &self.paths.marker_filename, version) {
            warn!(error = %e, project_id = %project.id, "could not write version marker");
        }
    }

    // -- Uninstall ------------------------------------------------------------

    /// Delete the app's directory from the root it is installed in.
    ///
    /// Deletion is best-effort; whatever would not go away is listed in
    /// the returned [`CleanupReport`].
    ///
    /// # Errors
    ///
    /// [`LauncherError::SessionActive`] while an install for the id is
    /// running, [`LauncherError::NotInstalled`] when no root holds the
    /// app.
    pub async fn uninstall(&self, project_id: &str) -> LauncherResult<CleanupReport> {
        if self.installer.is_active(project_id) {
            return Err(LauncherError::SessionActive {
                project_id: project_id.to_string(),
            });
        }
        let roots = self.registry.list()?;
        let Some(root) = installed_root(project_id, &roots) else {
            return Err(LauncherError::NotInstalled {
                project_id: project_id.to_string(),
            });
        };

        let dir = root.join(project_id);
        info!(dir = %dir.display(), "uninstalling");
        let report = tokio::task::spawn_blocking(move || {
            let mut report = CleanupReport::default();
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!(error = %e, dir = %dir.display(), "uninstall left files behind");
                report.record(dir, e);
            }
            report
        })
        .await
        .map_err(|e| std::io::Error::other(format!("cleanup task failed: {e}")))?;
        Ok(report)
    }

    // -- Launch ---------------------------------------------------------------

    /// Spawn the installed executable, detached, with its own directory
    /// as working directory.
    ///
    /// Must be called from within a Tokio runtime; a monitor task
    /// publishes [`ProcessEvent::Exited`] when the process ends.
    ///
    /// # Errors
    ///
    /// [`LauncherError::NotInstalled`] when no root holds the
    /// executable, [`LauncherError::Io`] when it cannot be spawned.
    pub fn launch(&self, project: &ProjectEntry) -> LauncherResult<()> {
        let roots = self.registry.list()?;
        let exe_path = match resolve(project, &roots, &self.paths.marker_filename) {
            InstallState::Installed { exe_path, .. }
            | InstallState::UpdateAvailable { exe_path, .. } => exe_path,
            InstallState::NotInstalled => {
                return Err(LauncherError::NotInstalled {
                    project_id: project.id.clone(),
                });
            }
        };

        let workdir = exe_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let mut child = tokio::process::Command::new(&exe_path)
            .current_dir(&workdir)
            .spawn()?;
        info!(project_id = %project.id, exe = %exe_path.display(), "launched");

        let bus = self.bus.clone();
        let project_id = project.id.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    debug!(project_id, code = ?status.code(), "process exited");
                    bus.publish(ProcessEvent::Exited {
                        project_id,
                        exit_code: status.code(),
                    });
                }
                Err(e) => warn!(error = %e, project_id, "could not monitor process"),
            }
        });
        Ok(())
    }

    // -- Migration ------------------------------------------------------------

    /// One startup pass backfilling missing version markers from the
    /// catalog. Returns how many markers were written.
    ///
    /// # Errors
    ///
    /// Propagates catalog and registry failures; individual marker
    /// writes never abort the pass.
    pub async fn migrate_versions(&self) -> LauncherResult<usize> {
        let catalog = self.catalog.load().await?;
        let roots = self.registry.list()?;
        let marker = self.paths.marker_filename.clone();

        let written =
            tokio::task::spawn_blocking(move || migrate_version_markers(&catalog, &roots, &marker))
                .await
                .map_err(|e| std::io::Error::other(format!("migration task failed: {e}")))?;
        Ok(written)
    }

    // -- Self-update ----------------------------------------------------------

    /// Check the update endpoint for a launcher build other than
    /// `current_version`. `Ok(None)` when no endpoint is configured or
    /// the advertised version matches.
    ///
    /// # Errors
    ///
    /// Propagates fetch and decode failures as [`LauncherError::Net`].
    pub async fn check_launcher_update(
        &self,
        current_version: &str,
    ) -> LauncherResult<Option<UpdateInfo>> {
        let Some(url) = &self.update_url else {
            debug!("no update endpoint configured");
            return Ok(None);
        };
        Ok(selfupdate::check(&self.net, url, current_version).await?)
    }

    /// Download the advertised installer into `dir` and return its path.
    ///
    /// # Errors
    ///
    /// [`LauncherError::Cancelled`] when the shutdown token fires
    /// mid-transfer; network and filesystem failures otherwise.
    pub async fn download_installer(
        &self,
        info: &UpdateInfo,
        dir: &Path,
    ) -> LauncherResult<PathBuf> {
        selfupdate::download_installer(&self.net, info, dir, self.shutdown.child_token()).await
    }
}
