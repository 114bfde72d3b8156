#![forbid(unsafe_code)]

//! Download-and-unpack engine.
//!
//! One session per project id at a time; different ids install
//! concurrently. Progress and terminal outcomes are published on the
//! event bus, never returned.

mod engine;
mod error;
mod session;
mod writer;

pub use engine::{Installer, StartOutcome};
pub use error::{InstallError, InstallResult};
pub use writer::{WriteError, WriteItem, write_archive};
