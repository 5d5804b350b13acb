//! In-process catalogue store.
//!
//! Enforces the same unique keys and the same association rules as the
//! PostgreSQL schema, so services behave identically on either store.
//! Selected with `database.url = "memory://"`.

use crate::model::{
    Category, CategoryRow, NewCategory, NewProduct, NewSupplier, Product, ProductRow, Supplier,
    SupplierRow,
};
use crate::store::{CatalogStore, CategoryStore, ProductStore, StoreError, SupplierStore};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    categories: Vec<CategoryRow>,
    products: Vec<ProductRow>,
    suppliers: Vec<SupplierRow>,
    /// `(product_id, category_id)`
    product_categories: Vec<(Uuid, Uuid)>,
    /// `(supplier_id, product_id)`
    supplier_products: Vec<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn sorted_by<T: Clone, K: Ord>(rows: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(key);
    rows
}

impl Tables {
    fn products_where(&self, ids: impl Iterator<Item = Uuid>) -> Vec<ProductRow> {
        let ids: Vec<Uuid> = ids.collect();
        let rows: Vec<ProductRow> = self
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        sorted_by(&rows, |p| p.name.clone())
    }
}

impl CategoryStore for MemoryCatalog {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let tables = self.lock()?;
        Ok(sorted_by(&tables.categories, |c| c.name.clone())
            .into_iter()
            .map(|row| Category {
                products: tables.products_where(
                    tables
                        .product_categories
                        .iter()
                        .filter(|(_, c)| *c == row.id)
                        .map(|(p, _)| *p),
                ),
                row,
            })
            .collect())
    }

    fn insert_category(&self, new: &NewCategory) -> Result<Uuid, StoreError> {
        let mut tables = self.lock()?;
        if tables.categories.iter().any(|c| c.name == new.name) {
            return Err(StoreError::Conflict("categories_name_key".to_string()));
        }
        let id = Uuid::new_v4();
        tables.categories.push(CategoryRow {
            id,
            name: new.name.clone(),
        });
        Ok(id)
    }
}

impl ProductStore for MemoryCatalog {
    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.lock()?;
        Ok(sorted_by(&tables.products, |p| p.name.clone())
            .into_iter()
            .map(|row| {
                let category_ids: Vec<Uuid> = tables
                    .product_categories
                    .iter()
                    .filter(|(p, _)| *p == row.id)
                    .map(|(_, c)| *c)
                    .collect();
                let supplier_ids: Vec<Uuid> = tables
                    .supplier_products
                    .iter()
                    .filter(|(_, p)| *p == row.id)
                    .map(|(s, _)| *s)
                    .collect();
                let categories: Vec<CategoryRow> = tables
                    .categories
                    .iter()
                    .filter(|c| category_ids.contains(&c.id))
                    .cloned()
                    .collect();
                let suppliers: Vec<SupplierRow> = tables
                    .suppliers
                    .iter()
                    .filter(|s| supplier_ids.contains(&s.id))
                    .cloned()
                    .collect();
                Product {
                    categories: sorted_by(&categories, |c| c.name.clone()),
                    suppliers: sorted_by(&suppliers, |s| s.company_name.clone()),
                    row,
                }
            })
            .collect())
    }

    fn insert_product(&self, new: &NewProduct) -> Result<Uuid, StoreError> {
        let mut tables = self.lock()?;
        let linked: Vec<Uuid> = tables
            .categories
            .iter()
            .filter(|c| new.category_ids.contains(&c.id))
            .map(|c| c.id)
            .collect();
        if linked.is_empty() {
            return Err(StoreError::NotFound);
        }
        if tables.products.iter().any(|p| p.name == new.name) {
            return Err(StoreError::Conflict("products_name_key".to_string()));
        }

        let id = Uuid::new_v4();
        tables.products.push(ProductRow {
            id,
            name: new.name.clone(),
            price: new.price,
            stock: new.stock,
        });
        tables
            .product_categories
            .extend(linked.into_iter().map(|category| (id, category)));
        Ok(id)
    }
}

impl SupplierStore for MemoryCatalog {
    fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        let tables = self.lock()?;
        Ok(sorted_by(&tables.suppliers, |s| s.company_name.clone())
            .into_iter()
            .map(|row| Supplier {
                products: tables.products_where(
                    tables
                        .supplier_products
                        .iter()
                        .filter(|(s, _)| *s == row.id)
                        .map(|(_, p)| *p),
                ),
                row,
            })
            .collect())
    }

    fn insert_supplier(&self, new: &NewSupplier) -> Result<Uuid, StoreError> {
        let mut tables = self.lock()?;
        if tables
            .suppliers
            .iter()
            .any(|s| s.company_name == new.company_name)
        {
            return Err(StoreError::Conflict("suppliers_company_name_key".to_string()));
        }
        if new.tax_id.is_some() && tables.suppliers.iter().any(|s| s.tax_id == new.tax_id) {
            return Err(StoreError::Conflict("suppliers_tax_id_key".to_string()));
        }

        let id = Uuid::new_v4();
        let linked: Vec<Uuid> = tables
            .products
            .iter()
            .filter(|p| new.product_ids.contains(&p.id))
            .map(|p| p.id)
            .collect();
        tables.suppliers.push(SupplierRow {
            id,
            company_name: new.company_name.clone(),
            tax_id: new.tax_id.clone(),
        });
        tables
            .supplier_products
            .extend(linked.into_iter().map(|product| (id, product)));
        Ok(id)
    }
}

impl CatalogStore for MemoryCatalog {
    fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
