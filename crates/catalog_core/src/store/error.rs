//! Store error taxonomy.
//!
//! Sentinel variants are matched through [`ErrorKind`], a plain `Copy + Eq`
//! tag. Backend failures the classifier does not recognize are kept in
//! [`StoreError::Unknown`] with the failing operation name.

use crate::db::DbError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted entity kind, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    ServiceType,
    CatalogItem,
    CatalogItemInstance,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ServiceType => "service type",
            Self::CatalogItem => "catalog item",
            Self::CatalogItemInstance => "catalog item instance",
        };
        f.write_str(name)
    }
}

/// Closed set of failure kinds a store call can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    IdTaken,
    NameTaken,
    InstanceIdTaken,
    ReferencedServiceTypeMissing,
    ReferencedCatalogItemMissing,
    HasDependents,
    Unknown,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: EntityKind },
    #[error("{entity} ID already exists")]
    IdTaken { entity: EntityKind },
    /// Another service type already uses the same `service_type` value.
    #[error("service type name already taken")]
    NameTaken,
    #[error("catalog item instance ID already exists")]
    InstanceIdTaken,
    #[error("referenced service type does not exist")]
    ReferencedServiceTypeMissing,
    #[error("referenced catalog item does not exist")]
    ReferencedCatalogItemMissing,
    #[error("cannot delete catalog item with existing instances")]
    HasDependents,
    #[error("failed to {op}: {source}")]
    Unknown {
        op: &'static str,
        source: DbError,
    },
}

impl StoreError {
    pub(crate) fn unknown(op: &'static str, source: impl Into<DbError>) -> Self {
        Self::Unknown {
            op,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::IdTaken { .. } => ErrorKind::IdTaken,
            Self::NameTaken => ErrorKind::NameTaken,
            Self::InstanceIdTaken => ErrorKind::InstanceIdTaken,
            Self::ReferencedServiceTypeMissing => ErrorKind::ReferencedServiceTypeMissing,
            Self::ReferencedCatalogItemMissing => ErrorKind::ReferencedCatalogItemMissing,
            Self::HasDependents => ErrorKind::HasDependents,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// True when the call was cut short by its deadline or cancel handle.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Unknown {
                source: DbError::Interrupted,
                ..
            }
        )
    }
}
