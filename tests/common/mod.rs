//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] owns a fresh on-disk catalog in a temp directory, loaded
//! through the real ingest path, and the real application router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use jop::db::Database;
use jop::ingest::document::CatalogDocument;
use jop::ingest::ingest_document;
use jop::server::{router, AppState};

/// Three episodes across two months:
/// E1 December, Fan Brush; E2 December, Palette Knife; E3 January, Fan Brush.
pub const CATALOG: &str = r##"
techniques:
  - {id: T001, name: Wet-on-Wet, difficulty_level: Beginner}
  - {id: T002, name: Knife Painting, difficulty_level: Intermediate}
tools:
  - {id: TL001, name: Fan Brush, category: Brush, techniques: [T001]}
  - {id: TL002, name: Palette Knife, category: Knife, techniques: [T002]}
colors:
  - {name: Bright Red, hex_code: "#DB0000"}
  - {name: Phthalo Blue, hex_code: "#0C0040"}
  - {name: Van Dyke Brown, hex_code: "#221B15"}
episodes:
  - title: Winter Sun
    season: 1
    episode: 1
    air_date: 1983-12-06
    youtube_url: https://www.youtube.com/embed/e1
    colors: [Bright Red]
    subjects: [Trees, Mountain]
    tools: [TL001]
    techniques: [T001]
  - title: Quiet Stream
    season: 1
    episode: 2
    air_date: 1983-12-13
    colors: [Phthalo Blue, Van Dyke Brown]
    subjects: [Trees]
    tools: [TL002]
    techniques: [T002]
  - title: Snowy Cabin
    season: 1
    episode: 3
    air_date: 1984-01-03
    colors: [Bright Red, {name: Van Dyke Brown, used: false}]
    subjects: [Cabin]
    tools: [TL001]
    techniques: [T001]
"##;

pub struct TestApp {
    pub router: Router,
    pub db_path: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("catalog.db");
        {
            let db = Database::open(&db_path).expect("Failed to open catalog");
            let doc = CatalogDocument::from_yaml(CATALOG).expect("Invalid fixture catalog");
            ingest_document(&db, &doc, "fixture", false).expect("Failed to ingest fixture");
        }

        let router = router(AppState::new(db_path.clone(), timeout));
        TestApp {
            router,
            db_path,
            _dir: dir,
        }
    }

    /// An app whose catalog file does not exist.
    pub fn without_catalog() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("missing.db");
        let router = router(AppState::new(db_path.clone(), Duration::from_secs(5)));
        TestApp {
            router,
            db_path,
            _dir: dir,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("Invalid request"),
        )
        .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&body);
        panic!("Failed to parse JSON: {text}");
    })
}

pub fn episode_ids(body: &Value) -> Vec<i64> {
    body["episodes"]
        .as_array()
        .expect("episodes array")
        .iter()
        .map(|e| e["id"].as_i64().expect("episode id"))
        .collect()
}
