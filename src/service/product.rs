use crate::model::Product;
use crate::service::{log_rejection, ServiceError};
use crate::store::{ProductStore, StoreError};
use crate::validation::{self, ValidationError};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// All products with their categories and suppliers.
    pub fn list(&self) -> Result<Vec<Product>, ServiceError> {
        self.store.list_products().map_err(|e| {
            log::warn!("failed to list products: {e}");
            ServiceError::from(e)
        })
    }

    /// Creates the product in every listed category that exists.
    ///
    /// When none of the listed categories exists the product would be left
    /// without one, so the request is rejected as invalid.
    pub fn create(&self, body: &Value) -> Result<Uuid, ServiceError> {
        let result = validation::product(body)
            .map_err(ServiceError::from)
            .and_then(|new| {
                self.store.insert_product(&new).map_err(|e| match e {
                    StoreError::NotFound => ServiceError::Validation(ValidationError::single(
                        "categorias",
                        "none of the listed categories exists",
                    )),
                    other => ServiceError::from(other),
                })
            });
        if let Err(err) = &result {
            log_rejection("product", err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CategoryStore, MemoryCatalog};
    use serde_json::json;

    #[test]
    fn test_unknown_categories_only_is_a_validation_error() {
        let service = ProductService::new(Arc::new(MemoryCatalog::new()));
        let err = service
            .create(&json!({
                "nome_produto": "RTX 4060",
                "preco": 2000,
                "estoque": 1,
                "categorias": [{ "id": Uuid::new_v4().to_string(), "nome_categoria": "Placa de vídeo" }],
            }))
            .unwrap_err();
        match err {
            ServiceError::Validation(e) => assert!(e.has_issue_at("categorias")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let store = Arc::new(MemoryCatalog::new());
        let category = store
            .insert_category(&crate::model::NewCategory {
                name: "Processador".to_string(),
            })
            .unwrap();
        let service = ProductService::new(store);
        let body = json!({
            "nome_produto": "Ryzen 5 5500",
            "preco": 600,
            "estoque": 0,
            "categorias": [{ "id": category.to_string(), "nome_categoria": "Processador" }],
        });
        service.create(&body).unwrap();
        assert_eq!(
            service.create(&body).unwrap_err(),
            ServiceError::Conflict("products_name_key".to_string())
        );
    }
}
