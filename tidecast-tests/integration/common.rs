//! Shared fixtures: a router over the simulated engine with seeded content.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tidecast_core::{TidecastConfig, TorrentService};
use tidecast_sim::{Catalog, CatalogEntry, SimEngine, SimEngineConfig};
use tower::ServiceExt;

/// Response pieces the tests assert on.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn header(&self, name: header::HeaderName) -> &str {
        self.headers[name].to_str().unwrap()
    }
}

/// Router plus the state behind it.
pub struct TestServer {
    pub router: Router,
    pub service: Arc<TorrentService>,
    pub engine: Arc<SimEngine>,
    pub clip: Arc<CatalogEntry>,
    pub show: Arc<CatalogEntry>,
    pub data_dir: TempDir,
}

/// Deterministic content repeating on a 251-byte cycle.
pub fn clip_bytes() -> Vec<u8> {
    (0..20_000u32).map(|i| (i % 251) as u8).collect()
}

impl TestServer {
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();
        let clip = catalog.insert_file("clip.mp4", clip_bytes());
        let show = catalog.insert_dir(
            "Show",
            vec![
                ("Episode 01.mkv", &b"first episode"[..]),
                ("Episode 02.mkv", &b"second episode"[..]),
                ("notes.txt", &b"notes"[..]),
            ],
        );

        let config = TidecastConfig::for_testing(data_dir.path());
        let engine = Arc::new(SimEngine::new(
            Arc::new(catalog),
            SimEngineConfig::from(&config),
        ));
        let service = Arc::new(TorrentService::new(engine.clone(), &config));

        Self {
            router: tidecast_web::router(Arc::clone(&service)),
            service,
            engine,
            clip,
            show,
            data_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Registers `entry` with every file queued.
    pub async fn add_all(&self, entry: &CatalogEntry) -> Value {
        let response = self
            .post_json(
                "/api/addmagnet",
                serde_json::json!({"Magnet": entry.magnet_link(), "AllFiles": true}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        response.json()
    }
}
