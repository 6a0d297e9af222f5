//! Filtered episode listing.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;
use uuid::Uuid;

use super::error::ApiResult;
use super::AppState;
use crate::search::deadline::Deadline;
use crate::search::filters::RawFilters;
use crate::search::paginate::PageRequest;
use crate::search::{ResultEnvelope, SearchRequest};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/episodes", get(list_episodes))
}

/// Cancels the query if the handler future is dropped before it finishes,
/// e.g. when the client disconnects.
struct CancelOnDrop(Deadline);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// `GET /api/episodes?month=12&tool=Fan+Brush&mode=OR&page=1&per_page=20`
///
/// Dimension keys repeat; values within a key are ORed.
async fn list_episodes(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ResultEnvelope>> {
    let raw = RawFilters::from_pairs(pairs);
    let request = SearchRequest {
        filters: raw.parse()?,
        page: PageRequest::parse(raw.page.as_deref(), raw.per_page.as_deref())?,
    };

    let request_id = Uuid::new_v4();
    debug!(%request_id, filters = ?request.filters, "Episode query received");

    let deadline = Deadline::after(state.request_timeout());
    let _cancel = CancelOnDrop(deadline.clone());

    let envelope = state
        .with_handle(move |db| Ok(db.execute(&request, &deadline)?))
        .await?;

    debug!(%request_id, total = envelope.pagination.total, "Episode query answered");
    Ok(Json(envelope))
}
