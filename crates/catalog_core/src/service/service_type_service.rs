//! Service type request service.
//!
//! # Responsibility
//! - Validate create requests and assemble the persisted `ServiceType`.
//! - Delegate reads and writes to a `ServiceTypeStore`.
//!
//! # Invariants
//! - Invalid requests never reach the store.
//! - Store failures pass through unchanged as `ServiceError::Store`.

use crate::model::service_type::{Metadata, ServiceType};
use crate::model::{JsonObject, API_VERSION};
use crate::store::{CallContext, Page, ServiceTypeListOptions, ServiceTypeStore, StoreError};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

/// Service types a caller may register.
pub const ALLOWED_SERVICE_TYPES: [&str; 4] = ["vm", "container", "cluster", "db"];

static DNS1123_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("DNS-1123 label pattern is valid")
});

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid service type `{0}`; expected one of vm, container, cluster, db")]
    InvalidServiceType(String),
    #[error("service type spec cannot be empty")]
    EmptySpec,
    #[error("invalid id `{0}`; must be a DNS-1123 label")]
    InvalidId(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for [`ServiceTypeService::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateServiceTypeRequest {
    /// Caller-chosen id. Absent or empty generates a UUID.
    pub id: Option<String>,
    /// Empty falls back to the current API version.
    pub api_version: String,
    pub service_type: String,
    pub labels: Option<BTreeMap<String, String>>,
    pub spec: JsonObject,
}

pub struct ServiceTypeService<S: ServiceTypeStore> {
    store: S,
}

impl<S: ServiceTypeStore> ServiceTypeService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates `request` and persists the resulting service type.
    ///
    /// # Errors
    /// - `InvalidServiceType`, `EmptySpec`, `InvalidId` on bad input.
    /// - `Store` for anything the store rejects (e.g. `NameTaken`).
    pub fn create(
        &self,
        ctx: &CallContext,
        request: &CreateServiceTypeRequest,
    ) -> ServiceResult<ServiceType> {
        validate_create(request)?;

        let mut service_type = match request.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                ServiceType::with_id(id, request.service_type.clone(), request.spec.clone())
            }
            None => ServiceType::new(request.service_type.clone(), request.spec.clone()),
        };
        if !request.api_version.is_empty() {
            service_type.api_version = request.api_version.clone();
        }
        if let Some(labels) = &request.labels {
            service_type.metadata = Metadata::with_labels(labels.clone());
        }

        let created = self.store.create(ctx, service_type)?;
        info!(
            "event=service_type_create module=service status=ok id={} service_type={}",
            created.id, created.service_type
        );
        Ok(created)
    }

    pub fn list(
        &self,
        ctx: &CallContext,
        opts: &ServiceTypeListOptions,
    ) -> ServiceResult<Page<ServiceType>> {
        Ok(self.store.list(ctx, opts)?)
    }

    pub fn get(&self, ctx: &CallContext, id: &str) -> ServiceResult<ServiceType> {
        Ok(self.store.get(ctx, id)?)
    }
}

fn validate_create(request: &CreateServiceTypeRequest) -> ServiceResult<()> {
    if !ALLOWED_SERVICE_TYPES.contains(&request.service_type.as_str()) {
        return Err(ServiceError::InvalidServiceType(
            request.service_type.clone(),
        ));
    }
    if request.spec.is_empty() {
        return Err(ServiceError::EmptySpec);
    }
    if let Some(id) = request.id.as_deref().filter(|id| !id.is_empty()) {
        if !is_dns1123_label(id) {
            return Err(ServiceError::InvalidId(id.to_string()));
        }
    }
    Ok(())
}

/// Lowercase alphanumerics and `-`, 1..=63 chars, alphanumeric at both ends.
pub fn is_dns1123_label(value: &str) -> bool {
    DNS1123_LABEL.is_match(value)
}
