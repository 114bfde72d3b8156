use thiserror::Error;

/// Errors reported synchronously when starting a session.
///
/// Everything that can go wrong after a session is accepted travels
/// over the event bus as an `InstallEvent::Failed`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// The catalog entry lacks a field the engine cannot work without.
    #[error("project entry incomplete: missing {field}")]
    InvalidProject { field: &'static str },
}

pub type InstallResult<T> = Result<T, InstallError>;
