//! HTTP contract.
//!
//! [`route`] maps a method, path and body onto a [`Reply`] without touching
//! sockets; [`server`] feeds it from `may_minihttp`.

pub mod server;

use crate::service::{Catalog, ServiceError};
use crate::validation;
use serde::Serialize;
use serde_json::Value;

pub const CONTENT_TYPE_JSON: &str = "Content-Type: application/json";
#[cfg(feature = "metrics")]
pub const CONTENT_TYPE_METRICS: &str = "Content-Type: text/plain; version=0.0.4";

pub const MSG_BAD_REQUEST: &str = "BAD_REQUEST: Dados invalidos";
pub const MSG_LIST_FAILED: &str = "INTERNAL_SERVER_ERROR: Não foi possível acessar os dados.";
pub const MSG_CREATE_FAILED: &str = "INTERNAL_SERVER_ERROR";

/// A response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Route label for metrics; bounded so unknown paths share one label.
    pub route: &'static str,
}

impl Reply {
    fn json(status: u16, route: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
            route,
        }
    }

    /// A JSON-encoded string body.
    fn message(status: u16, route: &'static str, message: &str) -> Self {
        Self::json(status, route, Value::from(message).to_string().into_bytes())
    }

    pub fn reason(&self) -> &'static str {
        reason_phrase(self.status)
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Categories,
    Products,
    Suppliers,
}

impl Entity {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/categorias" => Some(Entity::Categories),
            "/produtos" => Some(Entity::Products),
            "/fornecedores" => Some(Entity::Suppliers),
            _ => None,
        }
    }

    fn route(self) -> &'static str {
        match self {
            Entity::Categories => "/categorias",
            Entity::Products => "/produtos",
            Entity::Suppliers => "/fornecedores",
        }
    }

    fn created(self) -> &'static str {
        match self {
            Entity::Categories => "Categoria cadastrada com sucesso",
            Entity::Products => "Produto cadastrado com sucesso",
            Entity::Suppliers => "Fornecedor cadastrado com sucesso",
        }
    }

    fn duplicate(self) -> &'static str {
        match self {
            Entity::Categories => "BAD_REQUEST: Categoria já cadastrada.",
            Entity::Products => "BAD_REQUEST: Produto já cadastrado.",
            Entity::Suppliers => "BAD_REQUEST: Fornecedor já cadastrado",
        }
    }
}

#[derive(Serialize)]
struct Listing<'a, T> {
    result: &'a [T],
}

fn listing<T: Serialize>(entity: Entity, result: Result<Vec<T>, ServiceError>) -> Reply {
    let rows = match result {
        Ok(rows) => rows,
        Err(_) => return Reply::message(500, entity.route(), MSG_LIST_FAILED),
    };
    match serde_json::to_vec(&Listing { result: &rows }) {
        Ok(body) => Reply::json(200, entity.route(), body),
        Err(e) => {
            log::error!("failed to encode {} listing: {e}", entity.route());
            Reply::message(500, entity.route(), MSG_LIST_FAILED)
        }
    }
}

fn list(catalog: &Catalog, entity: Entity) -> Reply {
    match entity {
        Entity::Categories => listing(entity, catalog.categories.list()),
        Entity::Products => listing(entity, catalog.products.list()),
        Entity::Suppliers => listing(entity, catalog.suppliers.list()),
    }
}

fn create(catalog: &Catalog, entity: Entity, body: &[u8]) -> Reply {
    let result = validation::parse_body(body)
        .map_err(ServiceError::from)
        .and_then(|value| match entity {
            Entity::Categories => catalog.categories.create(&value),
            Entity::Products => catalog.products.create(&value),
            Entity::Suppliers => catalog.suppliers.create(&value),
        });

    match result {
        Ok(_) => Reply::message(200, entity.route(), entity.created()),
        Err(ServiceError::Validation(_)) => Reply::message(400, entity.route(), MSG_BAD_REQUEST),
        Err(ServiceError::Conflict(_)) => Reply::message(400, entity.route(), entity.duplicate()),
        Err(ServiceError::Storage(_)) => Reply::message(500, entity.route(), MSG_CREATE_FAILED),
    }
}

fn health(catalog: &Catalog) -> Reply {
    match catalog.ping() {
        Ok(()) => Reply::json(200, "/health", br#"{"status":"ok"}"#.to_vec()),
        Err(e) => {
            log::warn!("health check failed: {e}");
            Reply::json(503, "/health", br#"{"status":"unavailable"}"#.to_vec())
        }
    }
}

#[cfg(feature = "metrics")]
fn metrics() -> Reply {
    match crate::metrics::METRICS.render() {
        Ok(body) => Reply {
            status: 200,
            content_type: CONTENT_TYPE_METRICS,
            body,
            route: "/metrics",
        },
        Err(e) => {
            log::error!("failed to render metrics: {e}");
            Reply::message(500, "/metrics", MSG_CREATE_FAILED)
        }
    }
}

/// Dispatches one request. The query string, if any, is ignored.
pub fn route(catalog: &Catalog, method: &str, path: &str, body: &[u8]) -> Reply {
    let path = path.split('?').next().unwrap_or(path);

    if let Some(entity) = Entity::from_path(path) {
        return match method {
            "GET" => list(catalog, entity),
            "POST" => create(catalog, entity, body),
            _ => Reply::message(405, entity.route(), "METHOD_NOT_ALLOWED"),
        };
    }

    match (method, path) {
        ("GET", "/health") => health(catalog),
        (_, "/health") => Reply::message(405, "/health", "METHOD_NOT_ALLOWED"),
        #[cfg(feature = "metrics")]
        ("GET", "/metrics") => metrics(),
        #[cfg(feature = "metrics")]
        (_, "/metrics") => Reply::message(405, "/metrics", "METHOD_NOT_ALLOWED"),
        _ => Reply::message(404, "unmatched", "NOT_FOUND"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryCatalog, StoreError};
    use crate::validation::ValidationRules;
    use std::sync::Arc;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(MemoryCatalog::new()), ValidationRules::default())
    }

    fn body_str(reply: &Reply) -> String {
        serde_json::from_slice::<String>(&reply.body).unwrap()
    }

    #[test]
    fn test_post_category_then_duplicate() {
        let catalog = catalog();
        let body = br#"{"nome_categoria":"Processador"}"#;

        let reply = route(&catalog, "POST", "/categorias", body);
        assert_eq!(reply.status, 200);
        assert_eq!(body_str(&reply), "Categoria cadastrada com sucesso");

        let reply = route(&catalog, "POST", "/categorias", body);
        assert_eq!(reply.status, 400);
        assert_eq!(body_str(&reply), "BAD_REQUEST: Categoria já cadastrada.");
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let reply = route(&catalog(), "POST", "/fornecedores", b"{nome_empresa");
        assert_eq!(reply.status, 400);
        assert_eq!(body_str(&reply), MSG_BAD_REQUEST);
    }

    #[test]
    fn test_price_beyond_column_range_is_bad_request() {
        let catalog = catalog();
        route(&catalog, "POST", "/categorias", br#"{"nome_categoria":"Processador"}"#);
        let id = catalog.categories.list().unwrap()[0].row.id;
        let body = format!(
            r#"{{"nome_produto":"Ryzen 9 7950X","preco":1e16,"estoque":1,"categorias":[{{"id":"{id}","nome_categoria":"Processador"}}]}}"#
        );

        let reply = route(&catalog, "POST", "/produtos", body.as_bytes());
        assert_eq!(reply.status, 400);
        assert_eq!(body_str(&reply), MSG_BAD_REQUEST);
        assert!(catalog.products.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_wraps_result() {
        let catalog = catalog();
        route(&catalog, "POST", "/categorias", br#"{"nome_categoria":"AMD"}"#);
        let reply = route(&catalog, "GET", "/categorias?x=1", b"");
        assert_eq!(reply.status, 200);
        let value: Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(value["result"][0]["nome_categoria"], "AMD");
        assert_eq!(value["result"][0]["produtos"], serde_json::json!([]));
    }

    #[test]
    fn test_unknown_path_and_method() {
        let catalog = catalog();
        let reply = route(&catalog, "GET", "/nope", b"");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.route, "unmatched");

        let reply = route(&catalog, "DELETE", "/produtos", b"");
        assert_eq!(reply.status, 405);
        assert_eq!(reply.reason(), "Method Not Allowed");
    }

    #[test]
    fn test_health_ok() {
        let reply = route(&catalog(), "GET", "/health", b"");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, br#"{"status":"ok"}"#.to_vec());
    }

    struct DownStore;

    impl crate::store::CategoryStore for DownStore {
        fn list_categories(&self) -> Result<Vec<crate::model::Category>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn insert_category(&self, _: &crate::model::NewCategory) -> Result<uuid::Uuid, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    impl crate::store::ProductStore for DownStore {
        fn list_products(&self) -> Result<Vec<crate::model::Product>, StoreError> {
            Err(StoreError::Unknown("boom".into()))
        }
        fn insert_product(&self, _: &crate::model::NewProduct) -> Result<uuid::Uuid, StoreError> {
            Err(StoreError::Unknown("boom".into()))
        }
    }

    impl crate::store::SupplierStore for DownStore {
        fn list_suppliers(&self) -> Result<Vec<crate::model::Supplier>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn insert_supplier(&self, _: &crate::model::NewSupplier) -> Result<uuid::Uuid, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    impl crate::store::CatalogStore for DownStore {
        fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[test]
    fn test_storage_failures_are_500_and_health_503() {
        let catalog = Catalog::new(Arc::new(DownStore), ValidationRules::default());

        let reply = route(&catalog, "GET", "/produtos", b"");
        assert_eq!(reply.status, 500);
        assert_eq!(body_str(&reply), MSG_LIST_FAILED);

        let reply = route(&catalog, "POST", "/categorias", br#"{"nome_categoria":"AMD"}"#);
        assert_eq!(reply.status, 500);
        assert_eq!(body_str(&reply), MSG_CREATE_FAILED);

        // validation runs before the store is touched
        let reply = route(&catalog, "POST", "/categorias", br#"{"nome_categoria":"A"}"#);
        assert_eq!(reply.status, 400);

        let reply = route(&catalog, "GET", "/health", b"");
        assert_eq!(reply.status, 503);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_endpoint_renders_text() {
        crate::metrics::METRICS.record_response("GET", "/health", 200);
        let reply = route(&catalog(), "GET", "/metrics", b"");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, CONTENT_TYPE_METRICS);
        assert!(String::from_utf8(reply.body).unwrap().contains("stockroom_"));
    }
}
