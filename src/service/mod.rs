//! Entity services: validate the decoded body, then call the store.
//!
//! Each service owns a handle to the part of the store it needs; [`Catalog`]
//! builds all three from one store value at startup.

pub mod category;
pub mod product;
pub mod supplier;

pub use category::CategoryService;
pub use product::ProductService;
pub use supplier::SupplierService;

use crate::store::{CatalogStore, StoreError};
use crate::validation::{ValidationError, ValidationRules};
use std::fmt;
use std::sync::Arc;

/// Outcome of a failed service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The client sent something unacceptable
    Validation(ValidationError),
    /// A unique key is already taken; carries the constraint name
    Conflict(String),
    /// The store is unreachable or failed unexpectedly
    Storage(StoreError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(e) => write!(f, "{e}"),
            ServiceError::Conflict(c) => write!(f, "Already exists ({c})"),
            ServiceError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Validation(e) => Some(e),
            ServiceError::Storage(e) => Some(e),
            ServiceError::Conflict(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => ServiceError::Conflict(constraint),
            other => ServiceError::Storage(other),
        }
    }
}

/// Logs a failed create at the level its cause deserves.
pub(crate) fn log_rejection(entity: &str, err: &ServiceError) {
    match err {
        ServiceError::Validation(e) => log::debug!("rejected {entity}: {e}"),
        ServiceError::Conflict(c) => log::debug!("rejected {entity}: duplicate ({c})"),
        ServiceError::Storage(e) => log::warn!("failed to create {entity}: {e}"),
    }
}

/// The three services over one store.
#[derive(Clone)]
pub struct Catalog {
    pub categories: CategoryService,
    pub products: ProductService,
    pub suppliers: SupplierService,
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new<S: CatalogStore + 'static>(store: Arc<S>, rules: ValidationRules) -> Self {
        Self {
            categories: CategoryService::new(store.clone()),
            products: ProductService::new(store.clone()),
            suppliers: SupplierService::new(store.clone(), rules),
            store,
        }
    }

    /// Whether the store answers.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.store.ping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_becomes_service_conflict() {
        let err: ServiceError = StoreError::Conflict("products_name_key".into()).into();
        assert_eq!(err, ServiceError::Conflict("products_name_key".into()));

        let err: ServiceError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, ServiceError::Storage(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_service_error_source() {
        use std::error::Error;
        let err = ServiceError::Storage(StoreError::NotFound);
        assert!(err.source().is_some());
        assert!(ServiceError::Conflict("x".into()).source().is_none());
    }
}
