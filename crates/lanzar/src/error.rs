#![forbid(unsafe_code)]

use lanzar_catalog::CatalogError;
use lanzar_events::InstallFailure;
use lanzar_install::InstallError;
use lanzar_library::LibraryError;
use lanzar_net::NetError;
use thiserror::Error;

/// Errors surfaced by [`Launcher`](crate::Launcher) operations.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("library error: {0}")]
    Library(#[from] LibraryError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("network error: {0}")]
    Net(#[from] NetError),

    /// A driven install session ended in a `Failed` event. Cancellation
    /// is not routed here; it maps to
    /// [`InstallOutcome::Cancelled`](crate::InstallOutcome::Cancelled).
    #[error("install failed: {0}")]
    InstallFailed(InstallFailure),

    #[error("{project_id} is not installed")]
    NotInstalled { project_id: String },

    /// Uninstall refused while an install session holds the id.
    #[error("an install for {project_id} is still running")]
    SessionActive { project_id: String },

    /// The event stream ended while a driven install was still waiting
    /// for its terminal event.
    #[error("event stream closed before {project_id} reached a terminal state")]
    EventsClosed { project_id: String },

    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LauncherResult<T> = Result<T, LauncherError>;
