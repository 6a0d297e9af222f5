//! HTTP error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::error::QueryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{0}")]
    NotFound(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Query(e.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    field: Option<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::Cancelled) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Query(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Query(QueryError::InvalidFilter { .. }) => "invalid_filter",
            ApiError::Query(QueryError::InvalidPagination { .. }) => "invalid_pagination",
            ApiError::Query(QueryError::Cancelled) => "cancelled",
            ApiError::Query(QueryError::InternalConsistency(_)) => "internal_consistency",
            ApiError::Query(QueryError::Store(_)) => "store",
            ApiError::NotFound(_) => "not_found",
            ApiError::Task(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged in full and reported vaguely.
        let message = if status.is_server_error() && status != StatusCode::GATEWAY_TIMEOUT {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
            "internal server error".to_string()
        } else {
            if status == StatusCode::GATEWAY_TIMEOUT {
                tracing::warn!("query cancelled at deadline");
            }
            self.to_string()
        };

        let field = match &self {
            ApiError::Query(e) => e.field(),
            _ => None,
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
