use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::QueryError;

/// SQLite VM instructions between cancellation checks.
const PROGRESS_OPS: i32 = 1_000;

/// Expiry instant plus a shared cancellation flag.
///
/// Clones share the flag, so a caller can keep one copy and cancel a query
/// running on another thread.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Never expires; can still be cancelled.
    pub fn none() -> Self {
        Deadline::default()
    }

    pub fn after(timeout: Duration) -> Self {
        Deadline {
            expires_at: Instant::now().checked_add(timeout),
            cancelled: Arc::default(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_expired(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn check(&self) -> Result<(), QueryError> {
        if self.is_expired() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Interrupt statements on `conn` once the deadline passes. The handler is
    /// removed when the returned guard drops.
    pub(crate) fn install<'c>(&self, conn: &'c Connection) -> ProgressGuard<'c> {
        let deadline = self.clone();
        conn.progress_handler(PROGRESS_OPS, Some(move || deadline.is_expired()));
        ProgressGuard { conn }
    }
}

pub(crate) struct ProgressGuard<'c> {
    conn: &'c Connection,
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let deadline = Deadline::none();
        let handle = deadline.clone();
        assert!(deadline.check().is_ok());

        handle.cancel();
        assert!(deadline.is_expired());
        assert!(matches!(deadline.check(), Err(QueryError::Cancelled)));
    }

    #[test]
    fn zero_timeout_is_already_expired() {
        assert!(Deadline::after(Duration::ZERO).is_expired());
        assert!(!Deadline::after(Duration::from_secs(60)).is_expired());
    }

    #[test]
    fn expired_deadline_interrupts_statements() {
        let conn = Connection::open_in_memory().unwrap();
        let deadline = Deadline::none();
        deadline.cancel();
        let _guard = deadline.install(&conn);

        let err = conn
            .query_row(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 1000000)
                 SELECT COUNT(*) FROM n",
                [],
                |r| r.get::<_, i64>(0),
            )
            .unwrap_err();
        assert!(matches!(QueryError::from(err), QueryError::Cancelled));
    }

    #[test]
    fn guard_removes_the_handler() {
        let conn = Connection::open_in_memory().unwrap();
        let deadline = Deadline::none();
        deadline.cancel();
        drop(deadline.install(&conn));

        let n: i64 = conn
            .query_row(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 10000)
                 SELECT COUNT(*) FROM n",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(n, 10000);
    }
}
