pub mod combine;
pub mod deadline;
pub mod filters;
pub mod hydrate;
pub mod paginate;
pub mod predicate;
pub mod store;

use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::QueryError;
use combine::{combine, order_candidates};
use deadline::Deadline;
use filters::FilterSpec;
use hydrate::EpisodeRecord;
use paginate::{PageRequest, PaginationMeta};
use predicate::FilterPlan;

/// The response for one episode query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub episodes: Vec<EpisodeRecord>,
    pub pagination: PaginationMeta,
    pub filters_applied: FilterSpec,
}

/// A validated query: normalized filters plus a checked page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub filters: FilterSpec,
    pub page: PageRequest,
}

impl SearchRequest {
    pub fn new(filters: &FilterSpec, page: i64, per_page: i64) -> Result<Self, QueryError> {
        Ok(SearchRequest {
            filters: filters.normalized()?,
            page: PageRequest::new(page, per_page)?,
        })
    }
}

impl Database {
    /// Filter, order, paginate and hydrate episodes.
    ///
    /// Input is validated before any read. All reads run in one read
    /// transaction, so the envelope reflects a single snapshot of the store.
    pub fn search(
        &self,
        filters: &FilterSpec,
        page: i64,
        per_page: i64,
        deadline: &Deadline,
    ) -> Result<ResultEnvelope, QueryError> {
        let request = SearchRequest::new(filters, page, per_page)?;
        self.execute(&request, deadline)
    }

    /// Run an already validated request.
    pub fn execute(
        &self,
        request: &SearchRequest,
        deadline: &Deadline,
    ) -> Result<ResultEnvelope, QueryError> {
        deadline.check()?;
        let started = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        // Dropped before `tx`, so a rollback never runs under the handler.
        let _interrupt = deadline.install(&self.conn);

        let plan = FilterPlan::from_spec(&request.filters);
        debug!(?plan, "Evaluating filter plan");

        let constraints = self.evaluate_plan(&plan, deadline)?;
        let candidates = combine(&constraints, plan.logic);
        deadline.check()?;

        let ordered = order_candidates(self.episode_sort_keys()?, &candidates);
        let (window, pagination) = request.page.window(&ordered);
        deadline.check()?;

        let episodes = self.hydrate(window, deadline)?;
        tx.commit()?;

        info!(
            dimensions = plan.predicates.len(),
            logic = %plan.logic,
            total = pagination.total,
            page = pagination.page,
            returned = episodes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Episode query complete"
        );

        Ok(ResultEnvelope {
            episodes,
            pagination,
            filters_applied: request.filters.clone(),
        })
    }
}

/// Run a validated request on a fresh query-only handle for the catalog at
/// `path`. The handle is closed on every return path.
pub fn search_catalog(
    path: &Path,
    request: &SearchRequest,
    deadline: &Deadline,
) -> Result<ResultEnvelope, QueryError> {
    deadline.check()?;
    let db = Database::open_query_handle(path)?;
    db.execute(request, deadline)
}
