//! Service type store contract and SQLite implementation.
//!
//! # Responsibility
//! - Create, get and page through service types.
//! - Translate uniqueness failures into `IdTaken` / `NameTaken`.
//!
//! # Invariants
//! - Service types are append-only: no update or delete path exists.
//! - Listing order is `service_type ASC`, the natural key.

use super::constraint::{constraint_kind, resolve, ConstraintKind, Probe};
use super::context::CallContext;
use super::error::{EntityKind, StoreError, StoreResult};
use super::pagination::{Page, PageWindow};
use super::{now_epoch_ms, with_connection};
use crate::db::{Database, Json};
use crate::model::service_type::{Metadata, ServiceType};
use crate::model::JsonObject;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SERVICE_TYPE_SELECT_SQL: &str = "SELECT
    id,
    api_version,
    service_type,
    metadata,
    spec,
    path,
    create_time,
    update_time
FROM service_types";

const SERVICE_TYPE_ID_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM service_types WHERE id = ?1);";
const SERVICE_TYPE_NAME_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM service_types WHERE service_type = ?1);";

/// Paging options for service type listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTypeListOptions {
    pub page_token: Option<String>,
    /// Defaults to 50 when absent or zero.
    pub page_size: Option<u32>,
}

pub trait ServiceTypeStore: Send + Sync {
    fn list(
        &self,
        ctx: &CallContext,
        opts: &ServiceTypeListOptions,
    ) -> StoreResult<Page<ServiceType>>;
    /// Inserts a new service type; the returned copy carries timestamps.
    fn create(&self, ctx: &CallContext, service_type: ServiceType) -> StoreResult<ServiceType>;
    fn get(&self, ctx: &CallContext, id: &str) -> StoreResult<ServiceType>;
}

#[derive(Debug, Clone)]
pub struct SqliteServiceTypeStore {
    db: Database,
}

impl SqliteServiceTypeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ServiceTypeStore for SqliteServiceTypeStore {
    fn list(
        &self,
        ctx: &CallContext,
        opts: &ServiceTypeListOptions,
    ) -> StoreResult<Page<ServiceType>> {
        const OP: &str = "list service types";
        let window = PageWindow::resolve(opts.page_token.as_deref(), opts.page_size);

        with_connection(&self.db, ctx, OP, |conn| {
            let rows = query_service_types(conn, window)
                .map_err(|err| StoreError::unknown(OP, err))?;
            Ok(window.finish(rows))
        })
    }

    fn create(&self, ctx: &CallContext, mut service_type: ServiceType) -> StoreResult<ServiceType> {
        const OP: &str = "create service type";

        with_connection(&self.db, ctx, OP, |conn| {
            let now = now_epoch_ms();
            service_type.create_time = now;
            service_type.update_time = now;

            let metadata =
                (!service_type.metadata.is_empty()).then(|| Json(&service_type.metadata));
            let inserted = conn.execute(
                "INSERT INTO service_types (
                    id,
                    api_version,
                    service_type,
                    metadata,
                    spec,
                    path,
                    create_time,
                    update_time
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    service_type.id,
                    service_type.api_version,
                    service_type.service_type,
                    metadata,
                    Json(&service_type.spec),
                    service_type.path,
                    service_type.create_time,
                    service_type.update_time,
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(err) => Err(classify_create_failure(conn, err, &service_type)),
            }
        })?;

        Ok(service_type)
    }

    fn get(&self, ctx: &CallContext, id: &str) -> StoreResult<ServiceType> {
        const OP: &str = "get service type";

        with_connection(&self.db, ctx, OP, |conn| {
            conn.query_row(
                &format!("{SERVICE_TYPE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_service_type_row,
            )
            .optional()
            .map_err(|err| StoreError::unknown(OP, err))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::ServiceType,
            })
        })
    }
}

/// Only uniqueness failures are explained; the id check runs before the
/// natural-key check.
fn classify_create_failure(
    conn: &Connection,
    err: rusqlite::Error,
    attempted: &ServiceType,
) -> StoreError {
    const OP: &str = "create service type";

    let sentinel = match constraint_kind(&err) {
        Some(ConstraintKind::Unique) => resolve(
            conn,
            OP,
            [
                Probe::row_exists(
                    SERVICE_TYPE_ID_EXISTS_SQL,
                    &attempted.id,
                    StoreError::IdTaken {
                        entity: EntityKind::ServiceType,
                    },
                ),
                Probe::row_exists(
                    SERVICE_TYPE_NAME_EXISTS_SQL,
                    &attempted.service_type,
                    StoreError::NameTaken,
                ),
            ],
        ),
        _ => None,
    };
    sentinel.unwrap_or_else(|| StoreError::unknown(OP, err))
}

fn query_service_types(
    conn: &Connection,
    window: PageWindow,
) -> rusqlite::Result<Vec<ServiceType>> {
    let mut stmt = conn.prepare(&format!(
        "{SERVICE_TYPE_SELECT_SQL}
         ORDER BY service_type ASC
         LIMIT ?1 OFFSET ?2;"
    ))?;
    let rows = stmt.query_map(
        params![window.fetch_limit(), window.sql_offset()],
        parse_service_type_row,
    )?;
    rows.collect()
}

fn parse_service_type_row(row: &Row<'_>) -> rusqlite::Result<ServiceType> {
    let metadata: Option<Json<Metadata>> = row.get("metadata")?;
    let spec: Json<JsonObject> = row.get("spec")?;
    Ok(ServiceType {
        id: row.get("id")?,
        api_version: row.get("api_version")?,
        service_type: row.get("service_type")?,
        metadata: metadata.map(Json::into_inner).unwrap_or_default(),
        spec: spec.into_inner(),
        path: row.get("path")?,
        create_time: row.get("create_time")?,
        update_time: row.get("update_time")?,
    })
}
