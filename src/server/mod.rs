//! HTTP surface over the catalog.
//!
//! Handlers never share a connection: each request opens a query-only handle
//! on the blocking pool and drops it before responding.

pub mod episodes;
pub mod error;
pub mod health;
pub mod reference;

use anyhow::{Context, Result};
use axum::Router;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::Database;
use error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>, request_timeout: Duration) -> Self {
        AppState {
            db_path: Arc::new(db_path.into()),
            request_timeout,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Run `f` against a fresh query-only handle on the blocking pool.
    pub(crate) async fn with_handle<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.db_path);
        tokio::task::spawn_blocking(move || {
            let db = Database::open_query_handle(&path)?;
            f(&db)
        })
        .await
        .map_err(ApiError::from)?
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(episodes::router())
        .merge(reference::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    info!(
        bind = %bind,
        db = %state.db_path().display(),
        timeout_ms = state.request_timeout().as_millis() as u64,
        "Serving catalog"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
