use serde::Serialize;

use crate::error::QueryError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// A validated page request. `per_page` is always within 1..=MAX_PER_PAGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE as u64,
            per_page: DEFAULT_PER_PAGE as u32,
        }
    }
}

/// Pagination block of the result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u32,
    pub total: usize,
    pub pages: usize,
}

impl PageRequest {
    /// Pages start at 1; anything lower is rejected. `per_page` is clamped.
    pub fn new(page: i64, per_page: i64) -> Result<Self, QueryError> {
        if page < 1 {
            return Err(QueryError::invalid_pagination(
                "page",
                format!("page must be at least 1, got {page}"),
            ));
        }
        let page = page as u64;
        let per_page = per_page.clamp(1, MAX_PER_PAGE) as u32;
        Ok(PageRequest { page, per_page })
    }

    /// Parse optional query-string values, falling back to the defaults when a
    /// value is absent or blank.
    pub fn parse(page: Option<&str>, per_page: Option<&str>) -> Result<Self, QueryError> {
        let page = parse_number("page", page, DEFAULT_PAGE)?;
        let per_page = parse_number("per_page", per_page, DEFAULT_PER_PAGE)?;
        PageRequest::new(page, per_page)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Slice the ordered ids to this page. A page past the end yields an empty
    /// window with the real totals.
    pub fn window<'a, T>(&self, ordered: &'a [T]) -> (&'a [T], PaginationMeta) {
        let per_page = self.per_page as usize;
        let total = ordered.len();
        let meta = PaginationMeta {
            page: self.page,
            per_page: self.per_page,
            total,
            pages: total.div_ceil(per_page),
        };

        let start = usize::try_from(self.page - 1)
            .unwrap_or(usize::MAX)
            .saturating_mul(per_page);
        if start >= total {
            return (&ordered[..0], meta);
        }
        let end = start.saturating_add(per_page).min(total);
        (&ordered[start..end], meta)
    }
}

fn parse_number(field: &'static str, raw: Option<&str>, default: i64) -> Result<i64, QueryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s.parse().map_err(|_| {
            QueryError::invalid_pagination(field, format!("{s:?} is not an integer"))
        }),
    }
}
