//! Catalog item: mid tier, bound to one service type by natural key.
//!
//! # Invariants
//! - `spec.service_type` must name an existing service type.
//! - A catalog item cannot be deleted while instances reference it.

use super::{generate_id, resource_path, JsonObject, JsonValue, API_VERSION};
use serde::{Deserialize, Deserializer, Serialize};

/// Collection segment used in `CatalogItem::path`.
pub const CATALOG_ITEMS_COLLECTION: &str = "catalog-items";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub api_version: String,
    pub display_name: String,
    pub spec: CatalogItemSpec,
    pub path: String,
    pub create_time: i64,
    pub update_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItemSpec {
    pub service_type: String,
    #[serde(default)]
    pub fields: Vec<FieldConfiguration>,
}

/// One configurable field exposed by a catalog item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    /// Dotted path into the service type spec, e.g. `resources.cpu`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub editable: bool,
    /// `Some(JsonValue::Null)` is an explicit null default, distinct from `None`.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_schema: Option<JsonObject>,
}

/// Keeps a present `null` as `Some(Null)`; only a missing key means `None`.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

impl FieldConfiguration {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl CatalogItem {
    /// Creates a catalog item with a generated id.
    pub fn new(display_name: impl Into<String>, spec: CatalogItemSpec) -> Self {
        Self::with_id(generate_id(), display_name, spec)
    }

    /// Creates a catalog item with a caller-provided id.
    pub fn with_id(
        id: impl Into<String>,
        display_name: impl Into<String>,
        spec: CatalogItemSpec,
    ) -> Self {
        let id = id.into();
        Self {
            path: resource_path(CATALOG_ITEMS_COLLECTION, &id),
            id,
            api_version: API_VERSION.to_string(),
            display_name: display_name.into(),
            spec,
            create_time: 0,
            update_time: 0,
        }
    }
}

impl CatalogItemSpec {
    pub fn new(service_type: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            fields: Vec::new(),
        }
    }
}
