#![forbid(unsafe_code)]

//! Library roots and per-app install state.
//!
//! A *library root* is a directory apps get installed into, one
//! subdirectory per project id. The registry persists the ordered list
//! of roots; the resolver answers "is it installed, and which version"
//! with live filesystem checks.

mod error;
pub mod markers;
mod migration;
mod registry;
mod resolver;

pub use error::{LibraryError, LibraryResult};
pub use migration::migrate_version_markers;
pub use registry::{CleanupReport, LibraryRegistry};
pub use resolver::{InstallState, installed_root, resolve};
