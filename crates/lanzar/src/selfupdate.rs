#![forbid(unsafe_code)]

//! Launcher self-update: metadata check and installer download.
//!
//! Replacing the running binary is the installer's job; this module
//! only finds out whether one exists and fetches it.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use lanzar_install::{WriteError, WriteItem, write_archive};
use lanzar_net::{HttpClient, NetError, NetResult};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{LauncherError, LauncherResult};

/// Update endpoint body: `{"version": "...", "installer_url": "..."}`.
#[derive(Debug, Deserialize)]
struct UpdateMetadata {
    #[serde(default)]
    version: String,
    #[serde(default)]
    installer_url: String,
}

/// An advertised launcher build other than the running one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Version advertised by the update endpoint.
    pub version: String,
    /// Installer artifact location.
    pub installer_url: Url,
}

/// Fetch the update metadata and compare it against `current_version`.
///
/// Any difference counts as an update; version strings are compared for
/// equality, never ordered. A blank advertised version reads as "no
/// update".
pub(crate) async fn check(
    net: &HttpClient,
    url: &Url,
    current_version: &str,
) -> NetResult<Option<UpdateInfo>> {
    let raw = net.get_bytes(url.clone(), None).await?;
    let meta: UpdateMetadata = serde_json::from_slice(&raw)
        .map_err(|e| NetError::json(url, e))?;

    if meta.version.is_empty() || meta.version == current_version {
        debug!(advertised = %meta.version, "launcher is current");
        return Ok(None);
    }

    let installer_url = Url::parse(&meta.installer_url)
        .map_err(|e| NetError::json(url, format!("bad installer_url: {e}")))?;
    info!(version = %meta.version, "launcher update available");
    Ok(Some(UpdateInfo {
        version: meta.version,
        installer_url,
    }))
}

/// Download the installer artifact into `dir`, creating it if needed.
///
/// The partial file is deleted on failure or cancellation; on
/// cancellation the whole operation reports [`LauncherError::Cancelled`].
pub(crate) async fn download_installer(
    net: &HttpClient,
    info: &UpdateInfo,
    dir: &Path,
    cancel: CancellationToken,
) -> LauncherResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(installer_filename(&info.installer_url));

    let body = net.stream(info.installer_url.clone(), None).await?;
    let file = File::create(&path).await?;

    let mut written = std::pin::pin!(write_archive(body.stream, file, cancel));
    while let Some(item) = written.next().await {
        match item {
            Ok(WriteItem::Chunk { .. }) => {}
            Ok(WriteItem::Done { total_bytes }) => {
                info!(path = %path.display(), total_bytes, "installer downloaded");
                return Ok(path);
            }
            Err(e) => {
                discard(&path).await;
                return Err(match e {
                    WriteError::Source(net) => LauncherError::Net(net),
                    WriteError::Sink(io) => LauncherError::Io(io),
                });
            }
        }
    }

    // Ended without a Done item: the token fired mid-transfer.
    discard(&path).await;
    Err(LauncherError::Cancelled)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(error = %e, path = %path.display(), "could not delete partial installer");
    }
}

/// Basename of the installer URL, or a fixed fallback when the URL has
/// no usable final segment.
fn installer_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map_or_else(|| "installer.bin".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_comes_from_the_url_path() {
        let url = Url::parse("https://cdn.example.com/builds/setup-2.1.exe?token=x").unwrap();
        assert_eq!(installer_filename(&url), "setup-2.1.exe");
    }

    #[test]
    fn bare_url_falls_back() {
        let url = Url::parse("https://cdn.example.com/").unwrap();
        assert_eq!(installer_filename(&url), "installer.bin");
    }

    #[test]
    fn metadata_parses_with_missing_fields() {
        let meta: UpdateMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.version, "");
        assert_eq!(meta.installer_url, "");
    }
}
