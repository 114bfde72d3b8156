#![forbid(unsafe_code)]

//! Unified event bus for the lanzar install pipeline.

mod bus;
mod event;
mod install;
mod process;

pub use bus::EventBus;
pub use event::Event;
pub use install::{InstallEvent, InstallFailure};
pub use process::ProcessEvent;
