#![forbid(unsafe_code)]

use crate::{InstallEvent, ProcessEvent};

/// Unified event for the full launcher lifecycle.
///
/// Hierarchical: each subsystem has its own variant with a sub-enum.
#[derive(Clone, Debug)]
pub enum Event {
    /// Install session event.
    Install(InstallEvent),
    /// Launched process event.
    Process(ProcessEvent),
}

impl From<InstallEvent> for Event {
    fn from(e: InstallEvent) -> Self {
        Self::Install(e)
    }
}

impl From<ProcessEvent> for Event {
    fn from(e: ProcessEvent) -> Self {
        Self::Process(e)
    }
}
