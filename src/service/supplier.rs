use crate::model::Supplier;
use crate::service::{log_rejection, ServiceError};
use crate::store::SupplierStore;
use crate::validation::{self, ValidationRules};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SupplierService {
    store: Arc<dyn SupplierStore>,
    rules: ValidationRules,
}

impl SupplierService {
    pub fn new(store: Arc<dyn SupplierStore>, rules: ValidationRules) -> Self {
        Self { store, rules }
    }

    pub fn list(&self) -> Result<Vec<Supplier>, ServiceError> {
        self.store.list_suppliers().map_err(|e| {
            log::warn!("failed to list suppliers: {e}");
            ServiceError::from(e)
        })
    }

    /// Creates the supplier linked to every listed product that exists.
    pub fn create(&self, body: &Value) -> Result<Uuid, ServiceError> {
        let result = validation::supplier(body, &self.rules)
            .map_err(ServiceError::from)
            .and_then(|new| self.store.insert_supplier(&new).map_err(ServiceError::from));
        if let Err(err) = &result {
            log_rejection("supplier", err);
        }
        result
    }
}
