#![forbid(unsafe_code)]

//! Configuration for [`Launcher`](crate::Launcher).

use std::{path::PathBuf, time::Duration};

use lanzar_net::NetOptions;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Request timeout applied to catalog, image, and update-metadata
/// fetches. Archive downloads are never request-bound; they rely on
/// cancellation instead.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Name of the subfolder created inside a parent directory when it is
/// added as a library.
pub const APPS_SUBDIR: &str = "lanzar-apps";

/// Filename of the per-app version marker.
pub const MARKER_FILENAME: &str = "version.txt";

/// Filesystem layout of one launcher instance.
///
/// [`LauncherPaths::new`] puts everything under a single data
/// directory; the fields are plain paths so an embedder can relocate
/// any one of them, and tests point the whole thing at a temp dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    /// Verbatim copy of the last successfully fetched catalog body.
    pub catalog_cache_file: PathBuf,
    /// Flat directory of downloaded cover and icon images.
    pub image_cache_dir: PathBuf,
    /// Persisted JSON array of library root paths.
    pub libraries_file: PathBuf,
    /// Library root assumed while no list has been persisted yet.
    pub default_install_dir: PathBuf,
    /// Subfolder created under a parent on `add_library`.
    pub apps_subdir: String,
    /// Per-app version marker filename.
    pub marker_filename: String,
}

impl LauncherPaths {
    /// Standard layout under `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            catalog_cache_file: data_dir.join("catalog_cache.json"),
            image_cache_dir: data_dir.join("images"),
            libraries_file: data_dir.join("libraries.json"),
            default_install_dir: data_dir.join(APPS_SUBDIR),
            apps_subdir: APPS_SUBDIR.to_string(),
            marker_filename: MARKER_FILENAME.to_string(),
        }
    }
}

/// Unified configuration for creating a [`Launcher`](crate::Launcher).
///
/// # Example
///
/// ```ignore
/// use lanzar::LauncherConfig;
///
/// let config = LauncherConfig::new(catalog_url, "/var/lib/lanzar")
///     .with_update_url(update_url)
///     .with_cancel(shutdown.clone());
/// ```
pub struct LauncherConfig {
    /// Remote catalog endpoint.
    pub catalog_url: Url,
    /// Filesystem layout.
    pub paths: LauncherPaths,
    /// Launcher self-update metadata endpoint. `None` turns
    /// [`check_launcher_update`](crate::Launcher::check_launcher_update)
    /// into a no-op.
    pub update_url: Option<Url>,
    /// Shutdown token; cancelling it winds down every live install.
    pub cancel: Option<CancellationToken>,
    /// Network configuration (timeouts, pooling).
    pub net: NetOptions,
    /// Event bus capacity.
    pub event_capacity: usize,
}

impl LauncherConfig {
    /// Create a config with the standard layout under `data_dir`.
    #[must_use]
    pub fn new(catalog_url: Url, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog_url,
            paths: LauncherPaths::new(data_dir),
            update_url: None,
            cancel: None,
            net: NetOptions::default().with_request_timeout(DEFAULT_REQUEST_TIMEOUT),
            event_capacity: 64,
        }
    }

    /// Replace the filesystem layout wholesale.
    #[must_use]
    pub fn with_paths(mut self, paths: LauncherPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Set the self-update metadata endpoint.
    #[must_use]
    pub fn with_update_url(mut self, url: Url) -> Self {
        self.update_url = Some(url);
        self
    }

    /// Set the shutdown token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set network options.
    #[must_use]
    pub fn with_net(mut self, net: NetOptions) -> Self {
        self.net = net;
        self
    }

    /// Set the event bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
