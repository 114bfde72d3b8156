#![forbid(unsafe_code)]

//! Project catalog: remote-first loading, on-disk fallback, image cache.

mod cache;
mod error;
mod images;
mod model;

pub use cache::{CatalogCache, FRESHNESS_WINDOW};
pub use error::{CatalogError, CatalogResult};
pub use images::ImageCache;
pub use model::{Catalog, ProjectEntry};
