//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure pooled SQLite connections for the catalog store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Every pooled connection has `foreign_keys=ON` before first use.
//! - Store code must not read/write catalog data before migrations succeed.

use rusqlite::ErrorCode;
use thiserror::Error;

mod json;
pub mod migrations;
mod open;
mod pool;

pub use json::Json;
pub use open::{open_db, open_db_in_memory, PoolOptions};
pub use pool::{Database, PooledConn};

pub type DbResult<T> = Result<T, DbError>;

/// Backend failure surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    /// The caller's deadline passed or its cancel handle fired.
    #[error("operation interrupted: deadline exceeded or cancelled")]
    Interrupted,
    #[error("database handle is closed")]
    Closed,
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
            return Self::Interrupted;
        }
        Self::Sqlite(value)
    }
}

impl DbError {
    /// Returns the raw SQLite error when this failure came from the engine.
    pub fn as_sqlite(&self) -> Option<&rusqlite::Error> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}
