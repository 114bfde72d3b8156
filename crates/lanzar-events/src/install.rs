#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

/// Terminal failure reason carried by [`InstallEvent::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallFailure {
    /// The session was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,
    /// The download failed before the archive was complete.
    #[error("network error: {0}")]
    Network(String),
    /// The archive downloaded fully but could not be unpacked.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    /// Local filesystem error while writing or unpacking.
    #[error("io error: {0}")]
    Io(String),
}

/// Events emitted by install sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallEvent {
    /// Download advanced to a new whole percent of the archive size.
    ///
    /// Emitted only when `percent` changes, never twice with the same
    /// value in a row. When the server sends no Content-Length, only the
    /// final 100 is emitted.
    Progress { project_id: String, percent: u8 },
    /// Archive fully downloaded, unpack started.
    Extracting { project_id: String },
    /// Install finished. The executable the caller asked for is at `exe_path`.
    Completed { project_id: String, exe_path: PathBuf },
    /// Install ended without a usable result.
    Failed {
        project_id: String,
        reason: InstallFailure,
    },
}

impl InstallEvent {
    /// Project id this event belongs to.
    #[must_use]
    pub fn project_id(&self) -> &str {
        match self {
            Self::Progress { project_id, .. }
            | Self::Extracting { project_id }
            | Self::Completed { project_id, .. }
            | Self::Failed { project_id, .. } => project_id,
        }
    }
}
