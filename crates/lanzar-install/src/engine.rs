#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use futures::StreamExt;
use lanzar_catalog::ProjectEntry;
use lanzar_events::{Event, EventBus, InstallEvent, InstallFailure};
use lanzar_net::HttpClient;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{InstallError, InstallResult},
    session::Sessions,
    writer::{WriteItem, write_archive},
};

/// What [`Installer::start`] did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A worker was spawned for this project.
    Started,
    /// A session already owns the project's slot; nothing happened.
    AlreadyActive,
}

/// Download-and-unpack engine.
///
/// At most one session runs per project id; different ids run
/// concurrently with no coordination beyond disjoint directories.
/// Progress and terminal outcomes travel over the [`EventBus`].
#[derive(Clone)]
pub struct Installer {
    net: HttpClient,
    bus: EventBus,
    sessions: Sessions,
    shutdown: CancellationToken,
}

impl Installer {
    /// `shutdown` is the parent of every session's cancel token;
    /// cancelling it winds down all live installs.
    #[must_use]
    pub fn new(net: HttpClient, bus: EventBus, shutdown: CancellationToken) -> Self {
        Self {
            net,
            bus,
            sessions: Sessions::default(),
            shutdown,
        }
    }

    /// Start installing `project` into `library_root`.
    ///
    /// Must be called from within a Tokio runtime; the session runs on a
    /// spawned task. Everything past validation is reported through the
    /// bus, terminating in exactly one `Completed` or `Failed` per
    /// session. Starting a project whose session is live changes
    /// nothing and says so.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::InvalidProject`] when the entry has no id
    /// or no download URL. No network call is made in that case.
    pub fn start(
        &self,
        project: &ProjectEntry,
        library_root: &Path,
    ) -> InstallResult<StartOutcome> {
        if project.id.trim().is_empty() {
            return Err(InstallError::InvalidProject { field: "id" });
        }
        if project.download_url.trim().is_empty() {
            return Err(InstallError::InvalidProject {
                field: "download_url",
            });
        }

        let Some((cancel, _finished)) = self.sessions.try_begin(&project.id, &self.shutdown)
        else {
            debug!(project_id = %project.id, "install already running, ignoring start");
            return Ok(StartOutcome::AlreadyActive);
        };

        let worker = Worker {
            net: self.net.clone(),
            bus: self.bus.clone(),
            sessions: self.sessions.clone(),
            project: project.clone(),
            library_root: library_root.to_path_buf(),
            cancel,
        };
        tokio::spawn(worker.run());
        Ok(StartOutcome::Started)
    }

    /// Flag the live session for `project_id` to stop at the next chunk
    /// boundary. Returns whether a session was there to flag.
    ///
    /// The partial archive is deleted by the worker on its way out, not
    /// here; wait for the `Failed` event (or [`Installer::wait`]) before
    /// touching the install directory.
    pub fn cancel(&self, project_id: &str) -> bool {
        let flagged = self.sessions.cancel(project_id);
        if flagged {
            info!(project_id, "install cancellation requested");
        }
        flagged
    }

    /// True while a session owns the slot for `project_id`.
    #[must_use]
    pub fn is_active(&self, project_id: &str) -> bool {
        self.sessions.is_active(project_id)
    }

    /// Wait until the live session for `project_id` has published its
    /// terminal event and released its slot. Returns immediately when
    /// none is running.
    pub async fn wait(&self, project_id: &str) {
        if let Some(finished) = self.sessions.finished_token(project_id) {
            finished.cancelled().await;
        }
    }

    /// Subscribe to install events from every session.
    ///
    /// Events carry the project id; filter on the receiving side.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}

struct Worker {
    net: HttpClient,
    bus: EventBus,
    sessions: Sessions,
    project: ProjectEntry,
    library_root: PathBuf,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let project_id = self.project.id.clone();
        info!(project_id = %project_id, root = %self.library_root.display(), "install started");

        match self.run_phases().await {
            Ok(exe_path) => {
                info!(project_id = %project_id, exe_path = %exe_path.display(), "install completed");
                self.bus.publish(InstallEvent::Completed {
                    project_id: project_id.clone(),
                    exe_path,
                });
            }
            Err(reason) => {
                if reason == InstallFailure::Cancelled {
                    debug!(project_id = %project_id, "install cancelled");
                } else {
                    warn!(project_id = %project_id, error = %reason, "install failed");
                }
                self.bus.publish(InstallEvent::Failed {
                    project_id: project_id.clone(),
                    reason,
                });
            }
        }

        // Slot release strictly after the terminal event.
        self.sessions.finish(&project_id);
    }

    async fn run_phases(&self) -> Result<PathBuf, InstallFailure> {
        let install_dir = self.library_root.join(&self.project.id);
        tokio::fs::create_dir_all(&install_dir)
            .await
            .map_err(|e| InstallFailure::Io(e.to_string()))?;

        let url = Url::parse(&self.project.download_url)
            .map_err(|e| InstallFailure::Network(format!("invalid download URL: {e}")))?;
        let archive_path = install_dir.join(archive_filename(&url, &self.project.id));

        let total_bytes = self.download(&url, &archive_path).await?;

        self.bus.publish(InstallEvent::Extracting {
            project_id: self.project.id.clone(),
        });
        debug!(
            project_id = %self.project.id,
            archive = %archive_path.display(),
            total_bytes,
            "extracting archive"
        );
        extract_archive(&archive_path, &install_dir).await?;

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!(error = %e, archive = %archive_path.display(), "could not delete archive after extraction");
        }

        Ok(install_dir.join(&self.project.executable))
    }

    /// Stream the archive to disk, publishing whole-percent progress.
    /// On cancellation or a failed transfer the partial file is deleted
    /// here before returning.
    async fn download(&self, url: &Url, archive_path: &Path) -> Result<u64, InstallFailure> {
        let body = self
            .net
            .stream(url.clone(), None)
            .await
            .map_err(|e| InstallFailure::Network(e.to_string()))?;

        let file = tokio::fs::File::create(archive_path)
            .await
            .map_err(|e| InstallFailure::Io(e.to_string()))?;

        let mut gate = ProgressGate::new(body.content_length);
        let mut chunks = std::pin::pin!(write_archive(body.stream, file, self.cancel.clone()));

        while let Some(item) = chunks.next().await {
            match item {
                Ok(WriteItem::Chunk { downloaded }) => {
                    if let Some(percent) = gate.update(downloaded) {
                        self.bus.publish(InstallEvent::Progress {
                            project_id: self.project.id.clone(),
                            percent,
                        });
                    }
                }
                Ok(WriteItem::Done { total_bytes }) => {
                    if let Some(percent) = gate.finish() {
                        self.bus.publish(InstallEvent::Progress {
                            project_id: self.project.id.clone(),
                            percent,
                        });
                    }
                    return Ok(total_bytes);
                }
                Err(e) => {
                    self.discard_partial(archive_path).await;
                    return Err(e.into_failure());
                }
            }
        }

        // Ended without a Done item: the cancel branch fired.
        self.discard_partial(archive_path).await;
        Err(InstallFailure::Cancelled)
    }

    async fn discard_partial(&self, archive_path: &Path) {
        match tokio::fs::remove_file(archive_path).await {
            Ok(()) => debug!(archive = %archive_path.display(), "partial archive deleted"),
            Err(e) => {
                warn!(error = %e, archive = %archive_path.display(), "could not delete partial archive");
            }
        }
    }
}

/// Filename for the downloaded archive: the URL's basename, or
/// `<id>.zip` when the URL path has no usable final segment.
fn archive_filename(url: &Url, project_id: &str) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{project_id}.zip"))
}

/// Unpack `archive` into `dest` on the blocking pool.
async fn extract_archive(archive: &Path, dest: &Path) -> Result<(), InstallFailure> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive).map_err(|e| InstallFailure::Io(e.to_string()))?;
        let mut zip = zip::ZipArchive::new(file).map_err(classify_zip)?;
        zip.extract(&dest).map_err(classify_zip)
    })
    .await
    .map_err(|e| InstallFailure::Io(format!("extraction task failed: {e}")))?
}

fn classify_zip(e: zip::result::ZipError) -> InstallFailure {
    match e {
        zip::result::ZipError::Io(io) => InstallFailure::Io(io.to_string()),
        other => InstallFailure::CorruptArchive(other.to_string()),
    }
}

/// Collapses running byte counts into at-most-once whole-percent
/// emissions. Without a total, nothing is emitted until the final 100.
struct ProgressGate {
    total: Option<u64>,
    last: Option<u8>,
}

impl ProgressGate {
    fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            last: None,
        }
    }

    fn update(&mut self, downloaded: u64) -> Option<u8> {
        let total = self.total?;
        let percent = (downloaded.saturating_mul(100) / total).min(100) as u8;
        if self.last == Some(percent) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }

    fn finish(&mut self) -> Option<u8> {
        if self.last == Some(100) {
            return None;
        }
        self.last = Some(100);
        Some(100)
    }
}
