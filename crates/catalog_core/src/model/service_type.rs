//! Service type: root of the catalog hierarchy.
//!
//! # Invariants
//! - `id` and `service_type` are each globally unique.
//! - Immutable once created; there is no update path.

use super::{generate_id, resource_path, JsonObject, API_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collection segment used in `ServiceType::path`.
pub const SERVICE_TYPES_COLLECTION: &str = "service-types";

/// Optional descriptive metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl Metadata {
    pub fn with_labels(labels: BTreeMap<String, String>) -> Self {
        Self {
            labels: Some(labels),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceType {
    pub id: String,
    pub api_version: String,
    /// Short natural key such as `vm` or `container`.
    pub service_type: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: JsonObject,
    pub path: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl ServiceType {
    /// Creates a service type with a generated id.
    pub fn new(service_type: impl Into<String>, spec: JsonObject) -> Self {
        Self::with_id(generate_id(), service_type, spec)
    }

    /// Creates a service type with a caller-provided id.
    pub fn with_id(id: impl Into<String>, service_type: impl Into<String>, spec: JsonObject) -> Self {
        let id = id.into();
        Self {
            path: resource_path(SERVICE_TYPES_COLLECTION, &id),
            id,
            api_version: API_VERSION.to_string(),
            service_type: service_type.into(),
            metadata: Metadata::default(),
            spec,
            create_time: 0,
            update_time: 0,
        }
    }
}
