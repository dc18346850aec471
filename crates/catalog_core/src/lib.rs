//! Catalog persistence core.
//! Service types, catalog items and catalog item instances over SQLite.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{CatalogConfig, DatabaseConfig, LoggingConfig};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::catalog_item::{CatalogItem, CatalogItemSpec, FieldConfiguration};
pub use model::catalog_item_instance::{CatalogItemInstance, CatalogItemInstanceSpec, UserValue};
pub use model::service_type::{Metadata, ServiceType};
pub use model::{JsonObject, JsonValue};
pub use service::service_type_service::{
    CreateServiceTypeRequest, ServiceError, ServiceResult, ServiceTypeService,
};
pub use store::{
    CallContext, CancelHandle, CatalogItemInstanceListOptions, CatalogItemInstanceStore,
    CatalogItemListOptions, CatalogItemStore, EntityKind, ErrorKind, Page, ServiceTypeListOptions,
    ServiceTypeStore, Store, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
