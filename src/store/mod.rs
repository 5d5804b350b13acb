//! Persistence seam for the catalogue.
//!
//! Services hold an `Arc<dyn ...Store>` and only ever see [`StoreError`];
//! the PostgreSQL implementation classifies driver errors before returning.

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

use crate::model::{Category, NewCategory, NewProduct, NewSupplier, Product, Supplier};
use std::fmt;
use uuid::Uuid;

/// Tagged result of a persistence operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced row does not exist
    NotFound,
    /// A unique constraint rejected the write; carries the constraint name
    Conflict(String),
    /// The store could not be reached
    Unavailable(String),
    /// Anything else
    Unknown(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Not found"),
            StoreError::Conflict(c) => write!(f, "Conflict on {c}"),
            StoreError::Unavailable(s) => write!(f, "Store unavailable: {s}"),
            StoreError::Unknown(s) => write!(f, "Store error: {s}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub trait CategoryStore: Send + Sync {
    /// All categories by name, each with its products.
    fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    fn insert_category(&self, new: &NewCategory) -> Result<Uuid, StoreError>;
}

pub trait ProductStore: Send + Sync {
    /// All products by name, each with its categories and suppliers.
    fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Inserts the product attached to every listed category that exists.
    ///
    /// Returns [`StoreError::NotFound`] and writes nothing when none of
    /// `category_ids` resolves.
    fn insert_product(&self, new: &NewProduct) -> Result<Uuid, StoreError>;
}

pub trait SupplierStore: Send + Sync {
    fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError>;

    /// Inserts the supplier attached to every listed product that exists.
    fn insert_supplier(&self, new: &NewSupplier) -> Result<Uuid, StoreError>;
}

/// A store for the whole catalogue.
pub trait CatalogStore: CategoryStore + ProductStore + SupplierStore {
    /// Cheap reachability check used by `/health`.
    fn ping(&self) -> Result<(), StoreError>;
}
