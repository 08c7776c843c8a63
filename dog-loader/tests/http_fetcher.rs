use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;

use dog_loader::{
    DecompressingLoader, Fetcher, HttpFetcher, LoadError, LoaderConfig,
};

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn preview_png() -> Vec<u8> {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend((0..4096u32).map(|i| (i % 251) as u8));
    png
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn test_router() -> Router {
    let compressed = gzip(&preview_png());
    let proxied = compressed.clone();

    Router::new()
        .route(
            "/genomeark/species/contact.png.gz",
            get(move || {
                let body = compressed.clone();
                async move { body }
            }),
        )
        .route(
            "/dev-proxy/genomeark/species/contact.png.gz",
            get(move || {
                let body = proxied.clone();
                async move { body }
            }),
        )
        .route(
            "/genomeark/species/plain.png.gz",
            get(|| async { "this is not gzip" }),
        )
}

#[tokio::test]
async fn test_fetcher_returns_raw_body() {
    let addr = serve(test_router()).await;
    let fetcher = HttpFetcher::from_config(&LoaderConfig::default()).unwrap();

    let body = fetcher
        .fetch(&format!("http://{addr}/genomeark/species/contact.png.gz"))
        .await
        .unwrap();
    assert_eq!(body.as_ref(), gzip(&preview_png()).as_slice());
}

#[tokio::test]
async fn test_fetcher_with_shared_client() {
    let addr = serve(test_router()).await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let fetcher = HttpFetcher::with_client(client);

    let body = fetcher
        .fetch(&format!("http://{addr}/genomeark/species/contact.png.gz"))
        .await
        .unwrap();
    assert_eq!(body.as_ref(), gzip(&preview_png()).as_slice());
}

#[tokio::test]
async fn test_fetcher_maps_status_to_fetch_error() {
    let addr = serve(test_router()).await;
    let fetcher = HttpFetcher::from_config(&LoaderConfig::default()).unwrap();

    let err = fetcher
        .fetch(&format!("http://{addr}/genomeark/species/missing.png.gz"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Fetch { status: Some(404), .. }));
    assert_eq!(err.to_string(), "Failed to fetch: Not Found");
}

#[tokio::test]
async fn test_fetcher_maps_transport_failure() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = LoaderConfig::default().with_request_timeout(Duration::from_secs(5));
    let fetcher = HttpFetcher::from_config(&config).unwrap();
    let err = fetcher
        .fetch(&format!("http://{addr}/genomeark/x.png.gz"))
        .await
        .unwrap_err();
    assert!(err.is_fetch());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_loader_end_to_end() {
    let addr = serve(test_router()).await;
    let loader = DecompressingLoader::http(LoaderConfig::default()).unwrap();

    loader
        .set_source(Some(&format!("http://{addr}/genomeark/species/contact.png.gz")))
        .unwrap();
    let snapshot = loader.settled().await;

    let handle = snapshot.image.expect("image handle");
    let object = loader.handles().resolve(&handle).unwrap();
    assert_eq!(object.bytes.as_ref(), preview_png().as_slice());

    loader
        .set_source(Some(&format!("http://{addr}/genomeark/species/plain.png.gz")))
        .unwrap();
    let snapshot = loader.settled().await;
    assert!(snapshot.error.expect("decompression error").is_decompression());
    assert_eq!(loader.handles().stats().live(), 0);

    loader
        .set_source(Some(&format!("http://{addr}/genomeark/species/gone.png.gz")))
        .unwrap();
    let snapshot = loader.settled().await;
    assert_eq!(snapshot.error.expect("fetch error").status(), Some(404));
}

#[tokio::test]
async fn test_dev_mode_routes_through_proxy() {
    let addr = serve(test_router()).await;
    let config = LoaderConfig::default().development(format!("http://{addr}"));
    let loader = DecompressingLoader::http(config).unwrap();

    // Remote host is never contacted; only the local proxy path exists
    loader
        .set_source(Some("https://genomeark.invalid/genomeark/species/contact.png.gz"))
        .unwrap();
    let snapshot = loader.settled().await;

    let handle = snapshot.image.expect("image handle");
    let object = loader.handles().resolve(&handle).unwrap();
    assert_eq!(object.bytes.as_ref(), preview_png().as_slice());
}

#[tokio::test]
async fn test_custom_rewrite_overrides_mode() {
    let addr = serve(test_router()).await;
    let origin = format!("http://{addr}");
    let loader = DecompressingLoader::http(LoaderConfig::default())
        .unwrap()
        .with_rewrite(move |url: &str| url.replace("https://cdn.invalid", &origin));

    loader
        .set_source(Some("https://cdn.invalid/genomeark/species/contact.png.gz"))
        .unwrap();
    assert!(loader.settled().await.image.is_some());
}
