use thiserror::Error;

/// Errors from the registry and marker store.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed registry: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LibraryResult<T> = Result<T, LibraryError>;
