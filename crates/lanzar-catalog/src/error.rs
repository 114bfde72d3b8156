use thiserror::Error;

/// Errors produced while loading the catalog or caching images.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Remote fetch failed and no usable cached copy exists.
    #[error("catalog unavailable: remote fetch failed and no cached copy could be read")]
    Unavailable,

    #[error("network error: {0}")]
    Net(#[from] lanzar_net::NetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
