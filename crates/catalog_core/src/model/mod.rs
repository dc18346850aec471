//! Catalog domain model.
//!
//! # Responsibility
//! - Define the three persisted entity kinds and their nested spec shapes.
//! - Provide the opaque structured value used by schema-less spec fields.
//!
//! # Invariants
//! - Every entity is identified by a stable string `id`.
//! - `path` is always `<collection>/<id>` for entities built by constructors.
//! - Timestamps are epoch milliseconds assigned by the store.

pub mod catalog_item;
pub mod catalog_item_instance;
pub mod service_type;

/// Schema-less JSON value: null, bool, number, string, ordered array or
/// insertion-ordered map.
pub type JsonValue = serde_json::Value;

/// Schema-less JSON object with insertion order preserved.
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// API version stamped on entities built by the model constructors.
pub const API_VERSION: &str = "v1alpha1";

pub(crate) fn resource_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
