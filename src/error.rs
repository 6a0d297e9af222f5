use thiserror::Error;

/// Errors produced by the episode query engine.
///
/// Client errors (`InvalidFilter`, `InvalidPagination`) are raised before the
/// store is touched. Everything else aborts only the current query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid filter `{field}`: {message}")]
    InvalidFilter { field: &'static str, message: String },

    #[error("invalid pagination `{field}`: {message}")]
    InvalidPagination { field: &'static str, message: String },

    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("query cancelled before completion")]
    Cancelled,

    #[error("store error: {0}")]
    Store(rusqlite::Error),
}

impl QueryError {
    pub fn invalid_filter(field: &'static str, message: impl Into<String>) -> Self {
        QueryError::InvalidFilter {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_pagination(field: &'static str, message: impl Into<String>) -> Self {
        QueryError::InvalidPagination {
            field,
            message: message.into(),
        }
    }

    /// True when the caller sent something we refuse to run.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidFilter { .. } | QueryError::InvalidPagination { .. }
        )
    }

    /// Name of the offending request field, for client errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            QueryError::InvalidFilter { field, .. } | QueryError::InvalidPagination { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

/// An interrupted statement means the progress handler fired on an expired
/// deadline, so it maps to `Cancelled` rather than a store failure.
impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        if e.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted) {
            QueryError::Cancelled
        } else {
            QueryError::Store(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_statements_become_cancellation() {
        let interrupted = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            None,
        );
        assert!(matches!(QueryError::from(interrupted), QueryError::Cancelled));

        let other = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(QueryError::from(other), QueryError::Store(_)));
    }

    #[test]
    fn client_errors_carry_their_field() {
        let e = QueryError::invalid_filter("months", "13 is not a month");
        assert!(e.is_client_error());
        assert_eq!(e.field(), Some("months"));
        assert_eq!(e.to_string(), "invalid filter `months`: 13 is not a month");

        assert!(!QueryError::Cancelled.is_client_error());
        assert_eq!(QueryError::Cancelled.field(), None);
    }
}
