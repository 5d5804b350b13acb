use crate::model::Category;
use crate::service::{log_rejection, ServiceError};
use crate::store::CategoryStore;
use crate::validation;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// All categories with their products.
    pub fn list(&self) -> Result<Vec<Category>, ServiceError> {
        self.store.list_categories().map_err(|e| {
            log::warn!("failed to list categories: {e}");
            ServiceError::from(e)
        })
    }

    pub fn create(&self, body: &Value) -> Result<Uuid, ServiceError> {
        let result = validation::category(body)
            .map_err(ServiceError::from)
            .and_then(|new| self.store.insert_category(&new).map_err(ServiceError::from));
        if let Err(err) = &result {
            log_rejection("category", err);
        }
        result
    }
}
