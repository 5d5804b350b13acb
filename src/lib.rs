//! # Stockroom
//!
//! Coroutine-native catalogue service for products, categories and
//! suppliers, on PostgreSQL and the `may` runtime.
//!
//! Layers, leaves first: [`validation`] schemas, the [`store`] seam with a
//! PostgreSQL and an in-memory implementation, per-entity [`service`]s and
//! the [`http`] contract served by `may_minihttp`.

pub mod config;
pub mod connection;
pub mod executor;
pub mod http;
pub mod metrics;
pub mod migration;
pub mod model;
pub mod pool;
pub mod seed;
pub mod service;
pub mod store;
pub mod validation;

pub use config::AppConfig;
pub use executor::{DbError, PgExecutor, SqlExecutor};
pub use pool::DbPool;
pub use service::{Catalog, ServiceError};
pub use store::{CatalogStore, MemoryCatalog, PgCatalog, StoreError};
pub use validation::{ValidationError, ValidationRules};
