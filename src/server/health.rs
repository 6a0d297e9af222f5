//! Liveness and health endpoints.
//!
//! `/api/health` returns 200 when the catalog can be opened and read,
//! 503 Service Unavailable otherwise.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
}

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
    message: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "OK",
        message: "API is running",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = state
        .with_handle(|db| {
            db.conn
                .query_row("SELECT COUNT(*) FROM episodes", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
        .await;

    let (status_code, status) = match reachable {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
