//! Catalog persistence layer.
//!
//! # Responsibility
//! - Expose one store per entity kind plus the `Store` aggregate.
//! - Translate constraint failures into the `StoreError` taxonomy.
//!
//! # Invariants
//! - Each create/update/delete is one independent write; nothing spans
//!   entities or calls.
//! - Stores never retry, and classify a failure at most once per call.
//! - Every call checks out its own pooled connection and honors its
//!   `CallContext`.

use crate::config::DatabaseConfig;
use crate::db::{open_db, open_db_in_memory, Database, DbResult};
use log::debug;
use rusqlite::Connection;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub mod catalog_item_instance_store;
pub mod catalog_item_store;
mod constraint;
pub mod context;
pub mod error;
pub mod pagination;
pub mod service_type_store;

pub use catalog_item_instance_store::{
    CatalogItemInstanceListOptions, CatalogItemInstanceStore, SqliteCatalogItemInstanceStore,
};
pub use catalog_item_store::{CatalogItemListOptions, CatalogItemStore, SqliteCatalogItemStore};
pub use context::{CallContext, CancelHandle};
pub use error::{EntityKind, ErrorKind, StoreError, StoreResult};
pub use pagination::{decode_page_token, encode_page_token, Page, DEFAULT_PAGE_SIZE};
pub use service_type_store::{ServiceTypeListOptions, ServiceTypeStore, SqliteServiceTypeStore};

/// Handle composing the three stores over one shared database.
#[derive(Debug, Clone)]
pub struct Store {
    db: Database,
    service_types: SqliteServiceTypeStore,
    catalog_items: SqliteCatalogItemStore,
    catalog_item_instances: SqliteCatalogItemInstanceStore,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            service_types: SqliteServiceTypeStore::new(db.clone()),
            catalog_items: SqliteCatalogItemStore::new(db.clone()),
            catalog_item_instances: SqliteCatalogItemInstanceStore::new(db.clone()),
            db,
        }
    }

    /// Opens the configured database; `:memory:` selects an in-memory one.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        let db = if config.is_in_memory() {
            open_db_in_memory()?
        } else {
            open_db(&config.name, &config.pool_options())?
        };
        Ok(Self::new(db))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn service_types(&self) -> &dyn ServiceTypeStore {
        &self.service_types
    }

    pub fn catalog_items(&self) -> &dyn CatalogItemStore {
        &self.catalog_items
    }

    pub fn catalog_item_instances(&self) -> &dyn CatalogItemInstanceStore {
        &self.catalog_item_instances
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Closes the shared database for every clone of this store.
    ///
    /// Later calls fail with `Unknown` wrapping `DbError::Closed`. Idempotent.
    pub fn close(&self) {
        self.db.close();
    }
}

/// Runs `f` on a pooled connection bound to `ctx`, logging the outcome.
pub(crate) fn with_connection<T>(
    db: &Database,
    ctx: &CallContext,
    op: &'static str,
    f: impl FnOnce(&Connection) -> StoreResult<T>,
) -> StoreResult<T> {
    let started_at = Instant::now();
    let result = ctx
        .check()
        .and_then(|()| db.connection_within(ctx.remaining()))
        .map_err(|err| StoreError::unknown(op, err))
        .and_then(|conn| {
            let _interrupt = ctx.bind(&conn);
            f(&conn)
        });

    match &result {
        Ok(_) => debug!(
            "event=store_call module=store op=\"{}\" status=ok duration_ms={}",
            op,
            started_at.elapsed().as_millis()
        ),
        Err(err) => debug!(
            "event=store_call module=store op=\"{}\" status=error kind={:?} duration_ms={} error={}",
            op,
            err.kind(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{with_connection, CallContext, CancelHandle, Store, StoreError};
    use std::thread;
    use std::time::Duration;

    const ENDLESS_INSERT_SQL: &str = "WITH RECURSIVE seq(x) AS (
            SELECT 1 UNION ALL SELECT x + 1 FROM seq WHERE x < 1000000000
        )
        INSERT INTO service_types (
            id, api_version, service_type, metadata, spec, path, create_time, update_time
        )
        SELECT 'st-' || x, 'v1alpha1', 'type-' || x, NULL, '{}', 'service-types/st-' || x, 0, 0
        FROM seq;";

    /// Long enough to cross several progress-handler checkpoints.
    const SLOW_COUNT_SQL: &str = "WITH RECURSIVE seq(x) AS (
            SELECT 1 UNION ALL SELECT x + 1 FROM seq WHERE x < 100000
        )
        SELECT (SELECT COUNT(*) FROM service_types), COUNT(*) FROM seq;";

    fn run_endless_insert(store: &Store, ctx: &CallContext) -> StoreError {
        with_connection(store.database(), ctx, "bulk insert", |conn| {
            conn.execute(ENDLESS_INSERT_SQL, [])
                .map_err(|err| StoreError::unknown("bulk insert", err))
        })
        .unwrap_err()
    }

    fn assert_no_rows_and_handler_removed(store: &Store) {
        let (stored, counted): (i64, i64) =
            with_connection(store.database(), &CallContext::background(), "count", |conn| {
                conn.query_row(SLOW_COUNT_SQL, [], |row| Ok((row.get(0)?, row.get(1)?)))
                    .map_err(|err| StoreError::unknown("count", err))
            })
            .unwrap();
        assert_eq!(stored, 0);
        assert_eq!(counted, 100_000);
    }

    #[test]
    fn deadline_interrupts_running_statement_without_partial_writes() {
        let store = Store::open_in_memory().unwrap();
        let ctx = CallContext::with_timeout(Duration::from_millis(50));

        let err = run_endless_insert(&store, &ctx);

        assert!(err.is_interrupted(), "unexpected error: {err}");
        assert_no_rows_and_handler_removed(&store);
    }

    #[test]
    fn cancel_from_another_thread_interrupts_running_statement() {
        let store = Store::open_in_memory().unwrap();
        let handle = CancelHandle::new();
        let ctx = CallContext::background().with_cancel(handle.clone());

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
        });
        let err = run_endless_insert(&store, &ctx);
        canceller.join().unwrap();

        assert!(err.is_interrupted(), "unexpected error: {err}");
        assert_no_rows_and_handler_removed(&store);
    }
}
