#![forbid(unsafe_code)]

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use lanzar_net::HttpClient;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{CatalogError, CatalogResult},
    model::Catalog,
};

/// How long a cached catalog with a matching version tag counts as fresh.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// Remote-first catalog loader with an on-disk fallback copy.
///
/// Every successful remote fetch overwrites the cache file verbatim and
/// is the copy handed to the caller, so a restart right after a fetch
/// always sees what the server last said. The cache file only feeds
/// reads when the remote is unreachable.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    net: HttpClient,
    url: Url,
    cache_file: PathBuf,
}

impl CatalogCache {
    pub fn new(net: HttpClient, url: Url, cache_file: PathBuf) -> Self {
        Self {
            net,
            url,
            cache_file,
        }
    }

    /// Location of the on-disk fallback copy.
    #[must_use]
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Load the catalog, preferring the remote copy.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] when the remote fetch fails
    /// and the cache file is missing or unparseable. A cache write
    /// failure after a successful fetch is logged and swallowed.
    pub async fn load(&self) -> CatalogResult<Catalog> {
        match self.fetch_remote().await {
            Ok((catalog, raw)) => {
                if self.cached_copy_is_fresh(&catalog).await {
                    debug!(
                        version = %catalog.catalog_version,
                        "cache fresh, overwriting with remote copy anyway"
                    );
                }
                self.store(&raw).await;
                Ok(catalog)
            }
            Err(e) => {
                warn!(error = %e, url = %self.url, "remote catalog fetch failed, trying cached copy");
                match self.load_cached().await {
                    Ok(catalog) => Ok(catalog),
                    Err(cache_err) => {
                        warn!(
                            error = %cache_err,
                            path = %self.cache_file.display(),
                            "cached catalog unusable"
                        );
                        Err(CatalogError::Unavailable)
                    }
                }
            }
        }
    }

    async fn fetch_remote(&self) -> CatalogResult<(Catalog, Bytes)> {
        let raw = self.net.get_bytes(self.url.clone(), None).await?;
        let catalog: Catalog = serde_json::from_slice(&raw)?;
        Ok((catalog, raw))
    }

    /// Freshness probe, kept for observability only. The remote copy wins
    /// regardless of the answer so disk and server can never drift.
    async fn cached_copy_is_fresh(&self, remote: &Catalog) -> bool {
        let Ok(raw) = tokio::fs::read(&self.cache_file).await else {
            return false;
        };
        let Ok(cached) = serde_json::from_slice::<Catalog>(&raw) else {
            return false;
        };
        if cached.catalog_version != remote.catalog_version {
            return false;
        }
        cache_age(&self.cache_file)
            .await
            .is_some_and(|age| age < FRESHNESS_WINDOW)
    }

    async fn store(&self, raw: &[u8]) {
        if let Some(parent) = self.cache_file.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %e, "could not create catalog cache directory");
                return;
            }
        }
        match tokio::fs::write(&self.cache_file, raw).await {
            Ok(()) => debug!(path = %self.cache_file.display(), len = raw.len(), "catalog cache updated"),
            Err(e) => {
                warn!(error = %e, path = %self.cache_file.display(), "could not persist catalog cache");
            }
        }
    }

    async fn load_cached(&self) -> CatalogResult<Catalog> {
        let raw = tokio::fs::read(&self.cache_file).await?;
        let catalog = serde_json::from_slice(&raw)?;
        info!(path = %self.cache_file.display(), "loaded catalog from cache file");
        Ok(catalog)
    }
}

async fn cache_age(path: &Path) -> Option<Duration> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    let modified = metadata.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}
