//! Catalog item store contract and SQLite implementation.
//!
//! # Responsibility
//! - Full CRUD over `catalog_items`.
//! - Keep `spec_service_type` derived from `spec.service_type` on every write.
//!
//! # Invariants
//! - `spec.service_type` must reference an existing service type.
//! - Updates write only `display_name`, `spec` and `spec_service_type`, and
//!   stamp `update_time`; `id` and `create_time` never change.
//! - A catalog item with instances cannot be deleted.
//! - Listing order is `id ASC`.

use super::constraint::{constraint_kind, resolve, ConstraintKind, Probe};
use super::context::CallContext;
use super::error::{EntityKind, StoreError, StoreResult};
use super::pagination::{Page, PageWindow};
use super::{now_epoch_ms, with_connection};
use crate::db::{Database, Json};
use crate::model::catalog_item::{CatalogItem, CatalogItemSpec};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CATALOG_ITEM_SELECT_SQL: &str = "SELECT
    id,
    api_version,
    display_name,
    spec,
    path,
    create_time,
    update_time
FROM catalog_items";

const CATALOG_ITEM_ID_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM catalog_items WHERE id = ?1);";
const SERVICE_TYPE_NAME_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM service_types WHERE service_type = ?1);";

/// Paging and filter options for catalog item listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogItemListOptions {
    pub page_token: Option<String>,
    /// Defaults to 50 when absent or zero.
    pub page_size: Option<u32>,
    /// Exact match on `spec.service_type`. Empty means no filter.
    pub service_type: Option<String>,
}

pub trait CatalogItemStore: Send + Sync {
    fn list(
        &self,
        ctx: &CallContext,
        opts: &CatalogItemListOptions,
    ) -> StoreResult<Page<CatalogItem>>;
    /// Inserts a new catalog item; the returned copy carries timestamps.
    fn create(&self, ctx: &CallContext, catalog_item: CatalogItem) -> StoreResult<CatalogItem>;
    fn get(&self, ctx: &CallContext, id: &str) -> StoreResult<CatalogItem>;
    /// Rewrites the mutable columns of the item with `catalog_item.id` and
    /// stamps `update_time`.
    fn update(&self, ctx: &CallContext, catalog_item: &CatalogItem) -> StoreResult<()>;
    fn delete(&self, ctx: &CallContext, id: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteCatalogItemStore {
    db: Database,
}

impl SqliteCatalogItemStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl CatalogItemStore for SqliteCatalogItemStore {
    fn list(
        &self,
        ctx: &CallContext,
        opts: &CatalogItemListOptions,
    ) -> StoreResult<Page<CatalogItem>> {
        const OP: &str = "list catalog items";
        let window = PageWindow::resolve(opts.page_token.as_deref(), opts.page_size);
        let service_type = opts
            .service_type
            .as_deref()
            .filter(|value| !value.is_empty());

        with_connection(&self.db, ctx, OP, |conn| {
            let rows = query_catalog_items(conn, service_type, window)
                .map_err(|err| StoreError::unknown(OP, err))?;
            Ok(window.finish(rows))
        })
    }

    fn create(&self, ctx: &CallContext, mut catalog_item: CatalogItem) -> StoreResult<CatalogItem> {
        const OP: &str = "create catalog item";

        with_connection(&self.db, ctx, OP, |conn| {
            let now = now_epoch_ms();
            catalog_item.create_time = now;
            catalog_item.update_time = now;

            let inserted = conn.execute(
                "INSERT INTO catalog_items (
                    id,
                    api_version,
                    display_name,
                    spec,
                    path,
                    create_time,
                    update_time,
                    spec_service_type
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    catalog_item.id,
                    catalog_item.api_version,
                    catalog_item.display_name,
                    Json(&catalog_item.spec),
                    catalog_item.path,
                    catalog_item.create_time,
                    catalog_item.update_time,
                    catalog_item.spec.service_type,
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(err) => Err(classify_create_failure(conn, err, &catalog_item)),
            }
        })?;

        Ok(catalog_item)
    }

    fn get(&self, ctx: &CallContext, id: &str) -> StoreResult<CatalogItem> {
        const OP: &str = "get catalog item";

        with_connection(&self.db, ctx, OP, |conn| {
            conn.query_row(
                &format!("{CATALOG_ITEM_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_catalog_item_row,
            )
            .optional()
            .map_err(|err| StoreError::unknown(OP, err))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::CatalogItem,
            })
        })
    }

    fn update(&self, ctx: &CallContext, catalog_item: &CatalogItem) -> StoreResult<()> {
        const OP: &str = "update catalog item";

        with_connection(&self.db, ctx, OP, |conn| {
            let changed = conn
                .execute(
                    "UPDATE catalog_items
                     SET
                        display_name = ?1,
                        spec = ?2,
                        spec_service_type = ?3,
                        update_time = ?4
                     WHERE id = ?5;",
                    params![
                        catalog_item.display_name,
                        Json(&catalog_item.spec),
                        catalog_item.spec.service_type,
                        now_epoch_ms(),
                        catalog_item.id,
                    ],
                )
                .map_err(|err| match constraint_kind(&err) {
                    Some(ConstraintKind::ForeignKey) => StoreError::ReferencedServiceTypeMissing,
                    _ => StoreError::unknown(OP, err),
                })?;

            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: EntityKind::CatalogItem,
                });
            }
            Ok(())
        })
    }

    fn delete(&self, ctx: &CallContext, id: &str) -> StoreResult<()> {
        const OP: &str = "delete catalog item";

        with_connection(&self.db, ctx, OP, |conn| {
            let changed = conn
                .execute("DELETE FROM catalog_items WHERE id = ?1;", [id])
                .map_err(|err| match constraint_kind(&err) {
                    Some(ConstraintKind::ForeignKey) => StoreError::HasDependents,
                    _ => StoreError::unknown(OP, err),
                })?;

            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: EntityKind::CatalogItem,
                });
            }
            Ok(())
        })
    }
}

/// A foreign-key failure is confirmed by looking for the referenced service
/// type; otherwise a uniqueness failure is confirmed by looking for the id.
fn classify_create_failure(
    conn: &Connection,
    err: rusqlite::Error,
    attempted: &CatalogItem,
) -> StoreError {
    const OP: &str = "create catalog item";

    let sentinel = match constraint_kind(&err) {
        Some(ConstraintKind::ForeignKey) => resolve(
            conn,
            OP,
            [Probe::row_missing(
                SERVICE_TYPE_NAME_EXISTS_SQL,
                &attempted.spec.service_type,
                StoreError::ReferencedServiceTypeMissing,
            )],
        ),
        Some(ConstraintKind::Unique) => resolve(
            conn,
            OP,
            [Probe::row_exists(
                CATALOG_ITEM_ID_EXISTS_SQL,
                &attempted.id,
                StoreError::IdTaken {
                    entity: EntityKind::CatalogItem,
                },
            )],
        ),
        None => None,
    };
    sentinel.unwrap_or_else(|| StoreError::unknown(OP, err))
}

fn query_catalog_items(
    conn: &Connection,
    service_type: Option<&str>,
    window: PageWindow,
) -> rusqlite::Result<Vec<CatalogItem>> {
    let mut stmt = conn.prepare(&format!(
        "{CATALOG_ITEM_SELECT_SQL}
         WHERE (?1 IS NULL OR spec_service_type = ?1)
         ORDER BY id ASC
         LIMIT ?2 OFFSET ?3;"
    ))?;
    let rows = stmt.query_map(
        params![service_type, window.fetch_limit(), window.sql_offset()],
        parse_catalog_item_row,
    )?;
    rows.collect()
}

fn parse_catalog_item_row(row: &Row<'_>) -> rusqlite::Result<CatalogItem> {
    let spec: Json<CatalogItemSpec> = row.get("spec")?;
    Ok(CatalogItem {
        id: row.get("id")?,
        api_version: row.get("api_version")?,
        display_name: row.get("display_name")?,
        spec: spec.into_inner(),
        path: row.get("path")?,
        create_time: row.get("create_time")?,
        update_time: row.get("update_time")?,
    })
}
