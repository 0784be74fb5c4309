//! Integration tests for the offline cache over real HTTP.
//!
//! Uses wiremock for the dashboard origin and `DiskStorage` on a temp dir.
//! Outages are simulated with a switchable wrapper around `HttpNetwork` so
//! every test sees the same origin (and therefore the same request keys).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evergreen_core::{
    CacheError, CacheManager, CacheStorage, Config, DiskStorage, HttpNetwork, Network,
    NetworkError, Request, Response, ResponseSource, WorkerState,
};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MANIFEST: [&str; 3] = ["/", "/index.html", "/manifest.webmanifest"];

struct Switchable {
    inner: HttpNetwork,
    offline: AtomicBool,
}

impl Switchable {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: HttpNetwork::with_timeout(Duration::from_secs(5)).expect("client"),
            offline: AtomicBool::new(false),
        })
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for Switchable {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Connect("simulated outage".to_string()));
        }
        self.inner.fetch(request).await
    }
}

async fn mount_manifest(server: &MockServer, index_body: &str) {
    for (p, body) in [
        ("/", "<!doctype html><div id=root></div>"),
        ("/index.html", index_body),
        ("/manifest.webmanifest", r#"{"name":"Evergreen Eco-launderer"}"#),
    ] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

fn manager(
    version: &str,
    server: &MockServer,
    storage: &DiskStorage,
    network: &Arc<Switchable>,
) -> CacheManager {
    let origin = Url::parse(&server.uri()).unwrap();
    CacheManager::new(
        version,
        &origin,
        &MANIFEST,
        Arc::new(storage.clone()),
        network.clone(),
    )
    .expect("manager")
}

fn get(server: &MockServer, p: &str) -> Request {
    let origin = Url::parse(&server.uri()).unwrap();
    Request::for_path("GET", &origin, p).unwrap()
}

#[tokio::test]
async fn test_http_network_treats_error_status_as_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/finance/summary"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("boom")
                .insert_header("x-request-id", "abc"),
        )
        .mount(&server)
        .await;

    let network = HttpNetwork::new().unwrap();
    let resp = network
        .fetch(&get(&server, "/api/finance/summary"))
        .await
        .expect("500 is still a response");

    assert_eq!(resp.status, 500);
    assert_eq!(resp.text(), "boom");
    assert_eq!(resp.header("x-request-id"), Some("abc"));
}

#[tokio::test]
async fn test_http_network_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let network = HttpNetwork::with_timeout(Duration::from_secs(5)).unwrap();
    let url = Url::parse(&format!("http://127.0.0.1:{}/index.html", port)).unwrap();
    let result = network.fetch(&Request::get(url)).await;

    assert!(result.is_err(), "nothing listens on port {}", port);
}

#[tokio::test]
async fn test_http_network_forwards_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":42}"#))
        .mount(&server)
        .await;

    let origin = Url::parse(&server.uri()).unwrap();
    let request = Request::for_path("post", &origin, "/api/orders")
        .unwrap()
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"customer":7}"#);

    let resp = HttpNetwork::new().unwrap().fetch(&request).await.unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.text(), r#"{"id":42}"#);
}

#[tokio::test]
async fn test_version_bump_on_disk() {
    let server = MockServer::start().await;
    mount_manifest(&server, "<html>v1</html>").await;

    let temp_dir = TempDir::new().unwrap();
    let storage = DiskStorage::new(temp_dir.path().join("stores"));
    let network = Switchable::new();

    let v1 = manager("v1", &server, &storage, &network);
    assert_eq!(v1.install().await.unwrap(), 3);
    v1.activate().await.unwrap();
    assert_eq!(storage.entries("v1").await.unwrap().len(), 3);

    server.reset().await;
    mount_manifest(&server, "<html>v2</html>").await;

    // A later process: fresh storage handle on the same directory.
    let storage = DiskStorage::new(temp_dir.path().join("stores"));
    let v2 = manager("v2", &server, &storage, &network);
    v2.install().await.unwrap();
    assert_eq!(v2.activate().await.unwrap(), vec!["v1"]);

    assert_eq!(storage.tags().await.unwrap(), vec!["v2"]);
    assert!(!temp_dir.path().join("stores").join("v1").exists());
    assert_eq!(v2.entries().await.unwrap().len(), 3);

    network.go_offline();
    let (resp, source) = v2.handle_with_source(&get(&server, "/index.html")).await;
    assert_eq!(source, ResponseSource::Cache);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "<html>v2</html>");
}

#[tokio::test]
async fn test_activation_leaves_foreign_directories_alone() {
    let server = MockServer::start().await;
    mount_manifest(&server, "<html>v1</html>").await;

    // A cache root shared with other tools, e.g. `cache_dir: ~/.cache`.
    let temp_dir = TempDir::new().unwrap();
    let pip = temp_dir.path().join("pip").join("http");
    std::fs::create_dir_all(&pip).unwrap();
    std::fs::write(pip.join("important"), "keep").unwrap();

    let storage = DiskStorage::new(temp_dir.path());
    storage.open("v0").await.unwrap();
    let network = Switchable::new();

    let v1 = manager("v1", &server, &storage, &network);
    v1.install().await.unwrap();
    assert_eq!(v1.activate().await.unwrap(), vec!["v0"]);

    assert_eq!(storage.tags().await.unwrap(), vec!["v1"]);
    assert_eq!(std::fs::read_to_string(pip.join("important")).unwrap(), "keep");
}

#[tokio::test]
async fn test_install_fails_on_missing_manifest_resource() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = DiskStorage::new(temp_dir.path());
    let network = Switchable::new();
    let m = manager("v1", &server, &storage, &network);

    assert!(matches!(m.install().await, Err(CacheError::InstallFailed { .. })));
    assert_eq!(m.state().await, WorkerState::InstallFailed);
    assert!(!storage.has("v1").await.unwrap());
}

#[tokio::test]
async fn test_api_data_served_offline_after_refresh() {
    let server = MockServer::start().await;
    mount_manifest(&server, "<html></html>").await;
    Mock::given(method("GET"))
        .and(path("/api/reports/orders-by-status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"status":"ready","count":4}]"#)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = DiskStorage::new(temp_dir.path());
    let network = Switchable::new();
    let m = manager("v1", &server, &storage, &network);
    m.install().await.unwrap();
    m.activate().await.unwrap();

    let online = m.handle(&get(&server, "/api/reports/orders-by-status")).await;
    assert_eq!(online.status, 200);

    network.go_offline();
    let offline = m.handle(&get(&server, "/api/reports/orders-by-status")).await;
    assert_eq!(offline, online);
    assert_eq!(offline.header("content-type"), Some("application/json"));

    let missing = m.handle(&get(&server, "/api/customers")).await;
    assert!(missing.is_error());
}

#[tokio::test]
async fn test_manager_from_config_resumes_existing_store() {
    let server = MockServer::start().await;
    mount_manifest(&server, "<html></html>").await;

    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        origin: server.uri(),
        cache_dir: Some(temp_dir.path().join("stores")),
        ..Config::default()
    };
    let storage: Arc<dyn CacheStorage> = Arc::new(DiskStorage::new(config.cache_dir().unwrap()));
    let network: Arc<dyn Network> = Arc::new(config.network().unwrap());

    let first = config.build_manager(storage.clone(), network.clone()).unwrap();
    first.install().await.unwrap();
    first.activate().await.unwrap();

    let second = config.build_manager(storage, network).unwrap();
    assert!(second.resume().await.unwrap().is_empty());
    assert_eq!(second.state().await, WorkerState::Active);
    assert_eq!(second.entries().await.unwrap().len(), 3);
}
