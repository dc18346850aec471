//! Catalog item instance store contract and SQLite implementation.
//!
//! # Responsibility
//! - Full CRUD over `catalog_item_instances`.
//! - Keep `spec_catalog_item_id` derived from `spec.catalog_item_id`.
//!
//! # Invariants
//! - `spec.catalog_item_id` must reference an existing catalog item.
//! - Nothing references instances, so delete is unconditional.
//! - Listing order is `id ASC`.

use super::constraint::{constraint_kind, resolve, ConstraintKind, Probe};
use super::context::CallContext;
use super::error::{EntityKind, StoreError, StoreResult};
use super::pagination::{Page, PageWindow};
use super::{now_epoch_ms, with_connection};
use crate::db::{Database, Json};
use crate::model::catalog_item_instance::{CatalogItemInstance, CatalogItemInstanceSpec};
use rusqlite::{params, Connection, OptionalExtension, Row};

const INSTANCE_SELECT_SQL: &str = "SELECT
    id,
    api_version,
    display_name,
    spec,
    service_type_instance_uid,
    path,
    create_time,
    update_time
FROM catalog_item_instances";

const INSTANCE_ID_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM catalog_item_instances WHERE id = ?1);";
const CATALOG_ITEM_ID_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM catalog_items WHERE id = ?1);";

/// Paging and filter options for instance listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogItemInstanceListOptions {
    pub page_token: Option<String>,
    /// Defaults to 50 when absent or zero.
    pub page_size: Option<u32>,
    /// Exact match on `spec.catalog_item_id`. Empty means no filter.
    pub catalog_item_id: Option<String>,
}

pub trait CatalogItemInstanceStore: Send + Sync {
    fn list(
        &self,
        ctx: &CallContext,
        opts: &CatalogItemInstanceListOptions,
    ) -> StoreResult<Page<CatalogItemInstance>>;
    /// Inserts a new instance; the returned copy carries timestamps.
    fn create(
        &self,
        ctx: &CallContext,
        instance: CatalogItemInstance,
    ) -> StoreResult<CatalogItemInstance>;
    fn get(&self, ctx: &CallContext, id: &str) -> StoreResult<CatalogItemInstance>;
    /// Rewrites the mutable columns of the instance with `instance.id` and
    /// stamps `update_time`.
    fn update(&self, ctx: &CallContext, instance: &CatalogItemInstance) -> StoreResult<()>;
    fn delete(&self, ctx: &CallContext, id: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteCatalogItemInstanceStore {
    db: Database,
}

impl SqliteCatalogItemInstanceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl CatalogItemInstanceStore for SqliteCatalogItemInstanceStore {
    fn list(
        &self,
        ctx: &CallContext,
        opts: &CatalogItemInstanceListOptions,
    ) -> StoreResult<Page<CatalogItemInstance>> {
        const OP: &str = "list catalog item instances";
        let window = PageWindow::resolve(opts.page_token.as_deref(), opts.page_size);
        let catalog_item_id = opts
            .catalog_item_id
            .as_deref()
            .filter(|value| !value.is_empty());

        with_connection(&self.db, ctx, OP, |conn| {
            let rows = query_instances(conn, catalog_item_id, window)
                .map_err(|err| StoreError::unknown(OP, err))?;
            Ok(window.finish(rows))
        })
    }

    fn create(
        &self,
        ctx: &CallContext,
        mut instance: CatalogItemInstance,
    ) -> StoreResult<CatalogItemInstance> {
        const OP: &str = "create catalog item instance";

        with_connection(&self.db, ctx, OP, |conn| {
            let now = now_epoch_ms();
            instance.create_time = now;
            instance.update_time = now;

            let inserted = conn.execute(
                "INSERT INTO catalog_item_instances (
                    id,
                    api_version,
                    display_name,
                    spec,
                    service_type_instance_uid,
                    path,
                    create_time,
                    update_time,
                    spec_catalog_item_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    instance.id,
                    instance.api_version,
                    instance.display_name,
                    Json(&instance.spec),
                    instance.service_type_instance_uid,
                    instance.path,
                    instance.create_time,
                    instance.update_time,
                    instance.spec.catalog_item_id,
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(err) => Err(classify_create_failure(conn, err, &instance)),
            }
        })?;

        Ok(instance)
    }

    fn get(&self, ctx: &CallContext, id: &str) -> StoreResult<CatalogItemInstance> {
        const OP: &str = "get catalog item instance";

        with_connection(&self.db, ctx, OP, |conn| {
            conn.query_row(
                &format!("{INSTANCE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_instance_row,
            )
            .optional()
            .map_err(|err| StoreError::unknown(OP, err))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::CatalogItemInstance,
            })
        })
    }

    fn update(&self, ctx: &CallContext, instance: &CatalogItemInstance) -> StoreResult<()> {
        const OP: &str = "update catalog item instance";

        with_connection(&self.db, ctx, OP, |conn| {
            let changed = conn
                .execute(
                    "UPDATE catalog_item_instances
                     SET
                        display_name = ?1,
                        spec = ?2,
                        spec_catalog_item_id = ?3,
                        update_time = ?4
                     WHERE id = ?5;",
                    params![
                        instance.display_name,
                        Json(&instance.spec),
                        instance.spec.catalog_item_id,
                        now_epoch_ms(),
                        instance.id,
                    ],
                )
                .map_err(|err| match constraint_kind(&err) {
                    Some(ConstraintKind::ForeignKey) => StoreError::ReferencedCatalogItemMissing,
                    _ => StoreError::unknown(OP, err),
                })?;

            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: EntityKind::CatalogItemInstance,
                });
            }
            Ok(())
        })
    }

    fn delete(&self, ctx: &CallContext, id: &str) -> StoreResult<()> {
        const OP: &str = "delete catalog item instance";

        with_connection(&self.db, ctx, OP, |conn| {
            let changed = conn
                .execute("DELETE FROM catalog_item_instances WHERE id = ?1;", [id])
                .map_err(|err| StoreError::unknown(OP, err))?;

            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: EntityKind::CatalogItemInstance,
                });
            }
            Ok(())
        })
    }
}

fn classify_create_failure(
    conn: &Connection,
    err: rusqlite::Error,
    attempted: &CatalogItemInstance,
) -> StoreError {
    const OP: &str = "create catalog item instance";

    let sentinel = match constraint_kind(&err) {
        Some(ConstraintKind::ForeignKey) => resolve(
            conn,
            OP,
            [Probe::row_missing(
                CATALOG_ITEM_ID_EXISTS_SQL,
                &attempted.spec.catalog_item_id,
                StoreError::ReferencedCatalogItemMissing,
            )],
        ),
        Some(ConstraintKind::Unique) => resolve(
            conn,
            OP,
            [Probe::row_exists(
                INSTANCE_ID_EXISTS_SQL,
                &attempted.id,
                StoreError::InstanceIdTaken,
            )],
        ),
        None => None,
    };
    sentinel.unwrap_or_else(|| StoreError::unknown(OP, err))
}

fn query_instances(
    conn: &Connection,
    catalog_item_id: Option<&str>,
    window: PageWindow,
) -> rusqlite::Result<Vec<CatalogItemInstance>> {
    let mut stmt = conn.prepare(&format!(
        "{INSTANCE_SELECT_SQL}
         WHERE (?1 IS NULL OR spec_catalog_item_id = ?1)
         ORDER BY id ASC
         LIMIT ?2 OFFSET ?3;"
    ))?;
    let rows = stmt.query_map(
        params![catalog_item_id, window.fetch_limit(), window.sql_offset()],
        parse_instance_row,
    )?;
    rows.collect()
}

fn parse_instance_row(row: &Row<'_>) -> rusqlite::Result<CatalogItemInstance> {
    let spec: Json<CatalogItemInstanceSpec> = row.get("spec")?;
    Ok(CatalogItemInstance {
        id: row.get("id")?,
        api_version: row.get("api_version")?,
        display_name: row.get("display_name")?,
        spec: spec.into_inner(),
        service_type_instance_uid: row.get("service_type_instance_uid")?,
        path: row.get("path")?,
        create_time: row.get("create_time")?,
        update_time: row.get("update_time")?,
    })
}
