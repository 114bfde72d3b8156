#![forbid(unsafe_code)]

//! # Lanzar
//!
//! Facade crate wiring the catalog, library, and install engines into a
//! single launcher handle.
//!
//! ## Quick start
//!
//! ```ignore
//! use lanzar::prelude::*;
//!
//! let config = LauncherConfig::new(catalog_url, "/var/lib/lanzar");
//! let launcher = Launcher::new(config);
//!
//! launcher.migrate_versions().await?;
//! let catalog = launcher.catalog().await?;
//!
//! if let Some(project) = catalog.get("demo") {
//!     match launcher.install(project).await? {
//!         InstallOutcome::Completed(exe) => launcher.launch(project)?,
//!         other => println!("{other:?}"),
//!     }
//! }
//! ```

// ── Re-export sub-crates ────────────────────────────────────────────────

pub mod catalog {
    pub use lanzar_catalog::*;
}

pub mod events {
    pub use lanzar_events::*;
}

pub mod install {
    pub use lanzar_install::*;
}

pub mod library {
    pub use lanzar_library::*;
}

pub mod net {
    pub use lanzar_net::*;
}

// ── Launcher ────────────────────────────────────────────────────────────

mod config;
mod error;
mod launcher;
mod selfupdate;

pub use config::{
    APPS_SUBDIR, DEFAULT_REQUEST_TIMEOUT, LauncherConfig, LauncherPaths, MARKER_FILENAME,
};
pub use error::{LauncherError, LauncherResult};
pub use launcher::{InstallOutcome, Launcher};
pub use selfupdate::UpdateInfo;

// ── Prelude ─────────────────────────────────────────────────────────────

pub mod prelude {
    pub use lanzar_catalog::{Catalog, ProjectEntry};
    pub use lanzar_events::{Event, InstallEvent, InstallFailure, ProcessEvent};
    pub use lanzar_install::StartOutcome;
    pub use lanzar_library::{CleanupReport, InstallState};
    pub use lanzar_net::NetOptions;

    pub use crate::{
        InstallOutcome, Launcher, LauncherConfig, LauncherError, LauncherPaths, LauncherResult,
        UpdateInfo,
    };
}
