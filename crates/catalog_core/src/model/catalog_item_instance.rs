//! Catalog item instance: leaf tier, bound to one catalog item by id.
//!
//! # Invariants
//! - `spec.catalog_item_id` must name an existing catalog item.
//! - `service_type_instance_uid` is assigned externally and never validated here.

use super::{generate_id, resource_path, JsonValue, API_VERSION};
use serde::{Deserialize, Serialize};

/// Collection segment used in `CatalogItemInstance::path`.
pub const CATALOG_ITEM_INSTANCES_COLLECTION: &str = "catalog-item-instances";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItemInstance {
    pub id: String,
    pub api_version: String,
    pub display_name: String,
    pub spec: CatalogItemInstanceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type_instance_uid: Option<String>,
    pub path: String,
    pub create_time: i64,
    pub update_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItemInstanceSpec {
    pub catalog_item_id: String,
    #[serde(default)]
    pub user_values: Vec<UserValue>,
}

/// Value supplied by the user for one field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserValue {
    pub path: String,
    pub value: JsonValue,
}

impl UserValue {
    pub fn new(path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl CatalogItemInstance {
    /// Creates an instance with a generated id.
    pub fn new(display_name: impl Into<String>, spec: CatalogItemInstanceSpec) -> Self {
        Self::with_id(generate_id(), display_name, spec)
    }

    /// Creates an instance with a caller-provided id.
    pub fn with_id(
        id: impl Into<String>,
        display_name: impl Into<String>,
        spec: CatalogItemInstanceSpec,
    ) -> Self {
        let id = id.into();
        Self {
            path: resource_path(CATALOG_ITEM_INSTANCES_COLLECTION, &id),
            id,
            api_version: API_VERSION.to_string(),
            display_name: display_name.into(),
            spec,
            service_type_instance_uid: None,
            create_time: 0,
            update_time: 0,
        }
    }
}

impl CatalogItemInstanceSpec {
    pub fn new(catalog_item_id: impl Into<String>) -> Self {
        Self {
            catalog_item_id: catalog_item_id.into(),
            user_values: Vec::new(),
        }
    }
}
