//! Shared, cloneable handle over the bounded connection pool.

use super::{DbError, DbResult};
use log::info;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Migrated database reachable through a bounded pool.
///
/// Clones share the pool. Closing any clone releases the pool's idle
/// connections; connections checked out at that moment close on return.
#[derive(Clone)]
pub struct Database {
    pool: Arc<RwLock<Option<Pool<SqliteConnectionManager>>>>,
    max_connections: u32,
    mode: &'static str,
}

impl Database {
    pub(crate) fn new(pool: Pool<SqliteConnectionManager>, mode: &'static str) -> Self {
        Self {
            max_connections: pool.max_size(),
            pool: Arc::new(RwLock::new(Some(pool))),
            mode,
        }
    }

    /// Checks out one connection, waiting up to the pool's configured timeout.
    pub fn connection(&self) -> DbResult<PooledConn> {
        self.connection_within(None)
    }

    /// Checks out one connection, waiting at most `wait` when given.
    pub fn connection_within(&self, wait: Option<Duration>) -> DbResult<PooledConn> {
        let pool = self
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DbError::Closed)?;
        let conn = match wait {
            Some(wait) => pool.get_timeout(wait)?,
            None => pool.get()?,
        };
        Ok(conn)
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// `file` or `memory`.
    pub fn mode(&self) -> &'static str {
        self.mode
    }

    /// Drops the pool for every clone. Idempotent.
    pub fn close(&self) {
        let released = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            info!("event=db_close module=db status=ok mode={}", self.mode);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("mode", &self.mode)
            .field("max_connections", &self.max_connections)
            .field("closed", &self.is_closed())
            .finish()
    }
}
