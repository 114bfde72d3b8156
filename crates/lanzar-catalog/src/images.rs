#![forbid(unsafe_code)]

use std::path::PathBuf;

use lanzar_net::HttpClient;
use tracing::debug;
use url::Url;

use crate::error::CatalogResult;

/// On-disk cache of cover art and icons.
///
/// Filenames are derived from the cache key plus the URL basename, so a
/// changed URL fetches a new file while the old one stays behind as an
/// ordinary file in the cache directory.
#[derive(Debug, Clone)]
pub struct ImageCache {
    net: HttpClient,
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(net: HttpClient, dir: PathBuf) -> Self {
        Self { net, dir }
    }

    /// Path the image for `key` and `url` lives at, fetched or not.
    #[must_use]
    pub fn cached_path(&self, key: &str, url: &Url) -> PathBuf {
        self.dir.join(cache_filename(key, url))
    }

    /// Fetch an image into the cache and return its local path.
    ///
    /// A file already present for this key and URL is reused without
    /// touching the network.
    ///
    /// # Errors
    ///
    /// Returns the transport error on fetch failure, or the io error
    /// when the fetched bytes cannot be written.
    pub async fn fetch(&self, key: &str, url: &Url) -> CatalogResult<PathBuf> {
        let path = self.cached_path(key, url);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "image cache hit");
            return Ok(path);
        }

        let bytes = self.net.get_bytes(url.clone(), None).await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        debug!(path = %path.display(), len = bytes.len(), "image cached");
        Ok(path)
    }
}

/// Cache filename for a key and URL: `{key}_{basename}` squeezed down to
/// ASCII alphanumerics plus `.`, `_` and `-`. A URL without a usable
/// final path segment falls back to "image".
fn cache_filename(key: &str, url: &Url) -> String {
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image");
    sanitize(&format!("{key}_{basename}"))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("demo", "https://cdn.example.com/covers/art.png", "demo_art.png")]
    #[case(
        "demo",
        "https://cdn.example.com/covers/Art+Final!.png",
        "demo_ArtFinal.png"
    )]
    #[case("demo_icon", "https://cdn.example.com/i/ico.ico", "demo_icon_ico.ico")]
    #[case("demo", "https://cdn.example.com/covers/", "demo_image")]
    #[case("we/ird id", "https://cdn.example.com/a.jpg", "weirdid_a.jpg")]
    #[case("demo", "https://cdn.example.com/art.png?v=2", "demo_art.png")]
    fn filenames_are_sanitized(#[case] key: &str, #[case] url: &str, #[case] expected: &str) {
        let url = Url::parse(url).unwrap();
        assert_eq!(cache_filename(key, &url), expected);
    }

    #[test]
    fn cached_path_is_inside_cache_dir() {
        let cache = ImageCache::new(
            HttpClient::new(lanzar_net::NetOptions::default()),
            PathBuf::from("/tmp/images"),
        );
        let url = Url::parse("https://cdn.example.com/covers/art.png").unwrap();
        let path = cache.cached_path("demo", &url);
        assert!(path.starts_with("/tmp/images"));
        assert_eq!(path.file_name().unwrap(), "demo_art.png");
    }
}
