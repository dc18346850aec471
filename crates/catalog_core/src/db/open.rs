//! Connection pool bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite pools.
//! - Configure connection pragmas required by store behavior.
//! - Trigger schema migrations before returning a usable handle.
//!
//! # Invariants
//! - Pooled connections have `foreign_keys=ON`.
//! - Returned handles have migrations fully applied.
//! - In-memory pools hold exactly one connection that is never reaped.

use super::migrations::apply_migrations;
use super::pool::Database;
use super::{DbError, DbResult};
use log::{error, info};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Sizing and wait limits for a file-backed pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub busy_timeout: Duration,
    /// Longest a caller waits for a free pooled connection.
    pub connection_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

/// Opens a SQLite database file behind a bounded pool and applies all
/// pending migrations.
///
/// # Side effects
/// - Creates the file when missing and switches it to WAL journaling.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, options: &PoolOptions) -> DbResult<Database> {
    let busy_timeout = options.busy_timeout;
    let manager = SqliteConnectionManager::file(path.as_ref()).with_init(move |conn| {
        configure_connection(conn, busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(())
    });
    let builder = Pool::builder()
        .max_size(options.max_connections.max(1))
        .connection_timeout(options.connection_timeout);

    open_pool(builder, manager, "file")
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// Every SQLite in-memory connection is its own database, so the pool is
/// pinned to one connection for the lifetime of the handle.
pub fn open_db_in_memory() -> DbResult<Database> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| configure_connection(conn, DEFAULT_BUSY_TIMEOUT));
    let builder = Pool::builder()
        .max_size(1)
        .max_lifetime(None)
        .idle_timeout(None)
        .connection_timeout(DEFAULT_CONNECTION_TIMEOUT);

    open_pool(builder, manager, "memory")
}

fn open_pool(
    builder: r2d2::Builder<SqliteConnectionManager>,
    manager: SqliteConnectionManager,
    mode: &'static str,
) -> DbResult<Database> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let pool = match builder.build(manager) {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let migrated = pool
        .get()
        .map_err(DbError::from)
        .and_then(|mut conn| apply_migrations(&mut conn));
    match migrated {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={} max_connections={}",
                mode,
                started_at.elapsed().as_millis(),
                pool.max_size()
            );
            Ok(Database::new(pool, mode))
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}
