//! Per-call deadline and cancellation.
//!
//! # Invariants
//! - A call whose context is already done never touches the database.
//! - An interrupted statement is rolled back by SQLite; no partial writes.
//! - The progress handler is removed before the connection returns to the pool.

use crate::db::DbError;
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// SQLite VM instructions between deadline/cancel checks.
const PROGRESS_CHECK_INTERVAL: i32 = 1_000;

/// Shared flag that cancels every call holding a context built from it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Execution context passed to every store call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancelHandle>,
}

impl CallContext {
    /// Context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or_else(Self::default, Self::with_deadline)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Attaches a cancel handle; clones of `handle` can cancel this context.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_done(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub(crate) fn check(&self) -> Result<(), DbError> {
        if self.is_done() {
            return Err(DbError::Interrupted);
        }
        Ok(())
    }

    /// Installs a progress handler that aborts the running statement once
    /// this context is done. Dropping the guard removes the handler.
    pub(crate) fn bind<'conn>(&self, conn: &'conn Connection) -> InterruptGuard<'conn> {
        if self.deadline.is_none() && self.cancel.is_none() {
            return InterruptGuard { conn: None };
        }

        let deadline = self.deadline;
        let cancel = self.cancel.clone();
        conn.progress_handler(
            PROGRESS_CHECK_INTERVAL,
            Some(move || {
                cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
                    || deadline.is_some_and(|deadline| Instant::now() >= deadline)
            }),
        );
        InterruptGuard { conn: Some(conn) }
    }
}

pub(crate) struct InterruptGuard<'conn> {
    conn: Option<&'conn Connection>,
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn {
            conn.progress_handler(0, None::<fn() -> bool>);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CallContext, CancelHandle};
    use std::time::{Duration, Instant};

    #[test]
    fn background_context_is_never_done() {
        let ctx = CallContext::background();
        assert!(!ctx.is_done());
        assert!(ctx.remaining().is_none());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn elapsed_deadline_is_done() {
        let ctx = CallContext::with_deadline(Instant::now());
        assert!(ctx.is_done());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(ctx.check().is_err());
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let ctx = CallContext::with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn cancel_handle_is_shared_between_clones() {
        let handle = CancelHandle::new();
        let ctx = CallContext::with_timeout(Duration::from_secs(60)).with_cancel(handle.clone());
        assert!(!ctx.is_done());
        handle.cancel();
        assert!(ctx.is_done());
        assert!(ctx.clone().is_done());
    }
}
