use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use lanzar_catalog::{CatalogCache, CatalogError, ImageCache};
use lanzar_net::{HttpClient, NetOptions};
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;

const REMOTE_BODY: &str =
    r#"{"catalog_version":"1","projects":[{"id":"demo","title":"Remote"}]}"#;
const CACHED_BODY: &str =
    r#"{"catalog_version":"1","projects":[{"id":"demo","title":"Cached"}]}"#;

async fn serve(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn client() -> HttpClient {
    HttpClient::new(NetOptions::default())
}

async fn remote_catalog() -> &'static str {
    REMOTE_BODY
}

async fn remote_error() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

fn catalog_router() -> Router {
    Router::new().route("/catalog.json", get(remote_catalog))
}

fn broken_router() -> Router {
    Router::new().route("/catalog.json", get(remote_error))
}

#[tokio::test]
async fn remote_wins_even_when_cache_is_fresh() {
    let base = serve(catalog_router()).await;
    let dir = TempDir::new().unwrap();
    let cache_file = dir.path().join("catalog_cache.json");

    // Same version tag, freshly written: the stale-window check passes,
    // but the remote copy must still replace it and be returned.
    tokio::fs::write(&cache_file, CACHED_BODY).await.unwrap();

    let cache = CatalogCache::new(client(), base.join("catalog.json").unwrap(), cache_file.clone());
    let catalog = cache.load().await.unwrap();

    assert_eq!(catalog.get("demo").unwrap().title, "Remote");
    let on_disk = tokio::fs::read_to_string(&cache_file).await.unwrap();
    assert_eq!(on_disk, REMOTE_BODY);
}

#[tokio::test]
async fn successful_load_creates_cache_file() {
    let base = serve(catalog_router()).await;
    let dir = TempDir::new().unwrap();
    let cache_file = dir.path().join("nested").join("catalog_cache.json");

    let cache = CatalogCache::new(client(), base.join("catalog.json").unwrap(), cache_file.clone());
    let catalog = cache.load().await.unwrap();

    assert_eq!(catalog.catalog_version, "1");
    let on_disk = tokio::fs::read_to_string(&cache_file).await.unwrap();
    assert_eq!(on_disk, REMOTE_BODY);
}

#[tokio::test]
async fn remote_failure_falls_back_to_cached_copy() {
    let base = serve(broken_router()).await;
    let dir = TempDir::new().unwrap();
    let cache_file = dir.path().join("catalog_cache.json");
    tokio::fs::write(&cache_file, CACHED_BODY).await.unwrap();

    let cache = CatalogCache::new(client(), base.join("catalog.json").unwrap(), cache_file);
    let catalog = cache.load().await.unwrap();

    assert_eq!(catalog.get("demo").unwrap().title, "Cached");
}

#[tokio::test]
async fn unavailable_without_remote_or_cache() {
    let base = serve(broken_router()).await;
    let dir = TempDir::new().unwrap();

    let cache = CatalogCache::new(
        client(),
        base.join("catalog.json").unwrap(),
        dir.path().join("never_written.json"),
    );
    let error = cache.load().await.unwrap_err();

    assert!(matches!(error, CatalogError::Unavailable), "got {error:?}");
}

#[tokio::test]
async fn corrupt_cache_counts_as_missing() {
    let base = serve(broken_router()).await;
    let dir = TempDir::new().unwrap();
    let cache_file = dir.path().join("catalog_cache.json");
    tokio::fs::write(&cache_file, "{definitely not json")
        .await
        .unwrap();

    let cache = CatalogCache::new(client(), base.join("catalog.json").unwrap(), cache_file);
    let error = cache.load().await.unwrap_err();

    assert!(matches!(error, CatalogError::Unavailable), "got {error:?}");
}

#[tokio::test]
async fn cache_write_failure_still_returns_remote() {
    let base = serve(catalog_router()).await;
    let dir = TempDir::new().unwrap();

    // Parent of the cache path is a plain file, so the write must fail.
    let blocker = dir.path().join("blocker");
    tokio::fs::write(&blocker, b"").await.unwrap();

    let cache = CatalogCache::new(
        client(),
        base.join("catalog.json").unwrap(),
        blocker.join("catalog_cache.json"),
    );
    let catalog = cache.load().await.unwrap();

    assert_eq!(catalog.get("demo").unwrap().title, "Remote");
}

// ============================================================================
// Image cache
// ============================================================================

#[derive(Clone, Default)]
struct RequestCounter {
    count: Arc<AtomicUsize>,
}

async fn counted_image(State(counter): State<RequestCounter>) -> Vec<u8> {
    counter.count.fetch_add(1, Ordering::SeqCst);
    b"png-bytes".to_vec()
}

#[tokio::test]
async fn second_image_fetch_skips_the_network() {
    let counter = RequestCounter::default();
    let router = Router::new()
        .route("/art.png", get(counted_image))
        .with_state(counter.clone());
    let base = serve(router).await;
    let url = base.join("art.png").unwrap();

    let dir = TempDir::new().unwrap();
    let images = ImageCache::new(client(), dir.path().join("images"));

    let first = images.fetch("demo", &url).await.unwrap();
    let second = images.fetch("demo", &url).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(counter.count.load(Ordering::SeqCst), 1);
    assert_eq!(tokio::fs::read(&first).await.unwrap(), b"png-bytes");
}

#[tokio::test]
async fn changed_url_fetches_a_new_file() {
    let counter = RequestCounter::default();
    let router = Router::new()
        .route("/v1.png", get(counted_image))
        .route("/v2.png", get(counted_image))
        .with_state(counter.clone());
    let base = serve(router).await;

    let dir = TempDir::new().unwrap();
    let images = ImageCache::new(client(), dir.path().join("images"));

    let v1 = images
        .fetch("demo", &base.join("v1.png").unwrap())
        .await
        .unwrap();
    let v2 = images
        .fetch("demo", &base.join("v2.png").unwrap())
        .await
        .unwrap();

    assert_ne!(v1, v2);
    assert_eq!(counter.count.load(Ordering::SeqCst), 2);
}

async fn image_missing() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[tokio::test]
async fn image_fetch_error_is_typed() {
    let router = Router::new().route("/missing.png", get(image_missing));
    let base = serve(router).await;

    let dir = TempDir::new().unwrap();
    let images = ImageCache::new(client(), dir.path().join("images"));

    let error = images
        .fetch("demo", &base.join("missing.png").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(error, CatalogError::Net(_)), "got {error:?}");
}
