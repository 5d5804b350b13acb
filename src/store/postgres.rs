//! PostgreSQL catalogue store.
//!
//! Lists load relations selectinload-style: one query for the parent rows,
//! then one query per relation over the join table, grouped by parent id.
//! Creates are single statements, so a product is never visible without
//! its categories and a supplier never without its product links.

use crate::executor::{DbError, SqlExecutor};
use crate::model::{
    Category, CategoryRow, FromRow, NewCategory, NewProduct, NewSupplier, Product, ProductRow,
    Supplier, SupplierRow,
};
use crate::pool::DbPool;
use crate::store::{CatalogStore, CategoryStore, ProductStore, StoreError, SupplierStore};
use may_postgres::Row;
use once_cell::sync::Lazy;
use sea_query::{Expr, ExprTrait, Iden, Order, PostgresQueryBuilder, Query};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Copy, Clone, Debug)]
enum Categories {
    Table,
    Id,
    Name,
}

impl Iden for Categories {
    fn unquoted(&self) -> &str {
        match self {
            Categories::Table => "categories",
            Categories::Id => "id",
            Categories::Name => "name",
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Products {
    Table,
    Id,
    Name,
    Price,
    Stock,
}

impl Iden for Products {
    fn unquoted(&self) -> &str {
        match self {
            Products::Table => "products",
            Products::Id => "id",
            Products::Name => "name",
            Products::Price => "price",
            Products::Stock => "stock",
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Suppliers {
    Table,
    Id,
    CompanyName,
    TaxId,
}

impl Iden for Suppliers {
    fn unquoted(&self) -> &str {
        match self {
            Suppliers::Table => "suppliers",
            Suppliers::Id => "id",
            Suppliers::CompanyName => "company_name",
            Suppliers::TaxId => "tax_id",
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum ProductCategories {
    Table,
    ProductId,
    CategoryId,
}

impl Iden for ProductCategories {
    fn unquoted(&self) -> &str {
        match self {
            ProductCategories::Table => "product_categories",
            ProductCategories::ProductId => "product_id",
            ProductCategories::CategoryId => "category_id",
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum SupplierProducts {
    Table,
    SupplierId,
    ProductId,
}

impl Iden for SupplierProducts {
    fn unquoted(&self) -> &str {
        match self {
            SupplierProducts::Table => "supplier_products",
            SupplierProducts::SupplierId => "supplier_id",
            SupplierProducts::ProductId => "product_id",
        }
    }
}

const CATEGORY_COLUMNS: [(Categories, Categories); 2] = [
    (Categories::Table, Categories::Id),
    (Categories::Table, Categories::Name),
];

const PRODUCT_COLUMNS: [(Products, Products); 4] = [
    (Products::Table, Products::Id),
    (Products::Table, Products::Name),
    (Products::Table, Products::Price),
    (Products::Table, Products::Stock),
];

const SUPPLIER_COLUMNS: [(Suppliers, Suppliers); 3] = [
    (Suppliers::Table, Suppliers::Id),
    (Suppliers::Table, Suppliers::CompanyName),
    (Suppliers::Table, Suppliers::TaxId),
];

static SELECT_CATEGORIES: Lazy<String> = Lazy::new(|| {
    Query::select()
        .columns(CATEGORY_COLUMNS)
        .from(Categories::Table)
        .order_by((Categories::Table, Categories::Name), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

static SELECT_PRODUCTS: Lazy<String> = Lazy::new(|| {
    Query::select()
        .columns(PRODUCT_COLUMNS)
        .from(Products::Table)
        .order_by((Products::Table, Products::Name), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

static SELECT_SUPPLIERS: Lazy<String> = Lazy::new(|| {
    Query::select()
        .columns(SUPPLIER_COLUMNS)
        .from(Suppliers::Table)
        .order_by((Suppliers::Table, Suppliers::CompanyName), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

/// `(category_id, product...)` for every product_categories link.
static SELECT_PRODUCTS_BY_CATEGORY: Lazy<String> = Lazy::new(|| {
    Query::select()
        .column((ProductCategories::Table, ProductCategories::CategoryId))
        .columns(PRODUCT_COLUMNS)
        .from(ProductCategories::Table)
        .inner_join(
            Products::Table,
            Expr::col((Products::Table, Products::Id))
                .equals((ProductCategories::Table, ProductCategories::ProductId)),
        )
        .order_by((Products::Table, Products::Name), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

/// `(product_id, category...)` for every product_categories link.
static SELECT_CATEGORIES_BY_PRODUCT: Lazy<String> = Lazy::new(|| {
    Query::select()
        .column((ProductCategories::Table, ProductCategories::ProductId))
        .columns(CATEGORY_COLUMNS)
        .from(ProductCategories::Table)
        .inner_join(
            Categories::Table,
            Expr::col((Categories::Table, Categories::Id))
                .equals((ProductCategories::Table, ProductCategories::CategoryId)),
        )
        .order_by((Categories::Table, Categories::Name), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

/// `(product_id, supplier...)` for every supplier_products link.
static SELECT_SUPPLIERS_BY_PRODUCT: Lazy<String> = Lazy::new(|| {
    Query::select()
        .column((SupplierProducts::Table, SupplierProducts::ProductId))
        .columns(SUPPLIER_COLUMNS)
        .from(SupplierProducts::Table)
        .inner_join(
            Suppliers::Table,
            Expr::col((Suppliers::Table, Suppliers::Id))
                .equals((SupplierProducts::Table, SupplierProducts::SupplierId)),
        )
        .order_by((Suppliers::Table, Suppliers::CompanyName), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

/// `(supplier_id, product...)` for every supplier_products link.
static SELECT_PRODUCTS_BY_SUPPLIER: Lazy<String> = Lazy::new(|| {
    Query::select()
        .column((SupplierProducts::Table, SupplierProducts::SupplierId))
        .columns(PRODUCT_COLUMNS)
        .from(SupplierProducts::Table)
        .inner_join(
            Products::Table,
            Expr::col((Products::Table, Products::Id))
                .equals((SupplierProducts::Table, SupplierProducts::ProductId)),
        )
        .order_by((Products::Table, Products::Name), Order::Asc)
        .to_string(PostgresQueryBuilder)
});

const INSERT_CATEGORY: &str = "INSERT INTO categories (id, name) VALUES ($1, $2)";

// The product row is only written when at least one category resolves; the
// statement's row count is the number of category links created.
const INSERT_PRODUCT: &str = "\
WITH linked AS (
    SELECT id FROM categories WHERE id = ANY($5::uuid[])
), inserted AS (
    INSERT INTO products (id, name, price, stock)
    SELECT $1::uuid, $2::text, $3::numeric, $4::int4
    WHERE EXISTS (SELECT 1 FROM linked)
    RETURNING id
)
INSERT INTO product_categories (product_id, category_id)
SELECT inserted.id, linked.id FROM inserted CROSS JOIN linked";

const INSERT_SUPPLIER: &str = "\
WITH inserted AS (
    INSERT INTO suppliers (id, company_name, tax_id)
    VALUES ($1::uuid, $2::text, $3::text)
    RETURNING id
)
INSERT INTO supplier_products (supplier_id, product_id)
SELECT inserted.id, products.id FROM inserted
JOIN products ON products.id = ANY($4::uuid[])";

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { constraint, message } => {
                StoreError::Conflict(constraint.unwrap_or(message))
            }
            DbError::ForeignKeyViolation(_) => StoreError::NotFound,
            DbError::Unavailable(s) => StoreError::Unavailable(s),
            other => StoreError::Unknown(other.to_string()),
        }
    }
}

fn parse_rows<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|row| T::from_row(row).map_err(|e| StoreError::Unknown(e.to_string())))
        .collect()
}

/// Groups `(parent_id, child...)` rows by parent, keeping query order.
fn group_by_parent<T: FromRow>(rows: &[Row]) -> Result<HashMap<Uuid, Vec<T>>, StoreError> {
    let mut grouped: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        let parent: Uuid = row
            .try_get(0)
            .map_err(|e| StoreError::Unknown(e.to_string()))?;
        let child = T::from_row_at(row, 1).map_err(|e| StoreError::Unknown(e.to_string()))?;
        grouped.entry(parent).or_default().push(child);
    }
    Ok(grouped)
}

/// Catalogue store over the round-robin PostgreSQL pool.
pub struct PgCatalog {
    pool: Arc<DbPool>,
}

impl PgCatalog {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl CategoryStore for PgCatalog {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = self.pool.query_all(&SELECT_CATEGORIES, &[])?;
        let categories: Vec<CategoryRow> = parse_rows(&rows)?;

        let links = self.pool.query_all(&SELECT_PRODUCTS_BY_CATEGORY, &[])?;
        let mut products = group_by_parent::<ProductRow>(&links)?;

        Ok(categories
            .into_iter()
            .map(|row| Category {
                products: products.remove(&row.id).unwrap_or_default(),
                row,
            })
            .collect())
    }

    fn insert_category(&self, new: &NewCategory) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.pool.execute(INSERT_CATEGORY, &[&id, &new.name])?;
        log::debug!("inserted category {} ({})", new.name, id);
        Ok(id)
    }
}

impl ProductStore for PgCatalog {
    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = self.pool.query_all(&SELECT_PRODUCTS, &[])?;
        let products: Vec<ProductRow> = parse_rows(&rows)?;

        let links = self.pool.query_all(&SELECT_CATEGORIES_BY_PRODUCT, &[])?;
        let mut categories = group_by_parent::<CategoryRow>(&links)?;
        let links = self.pool.query_all(&SELECT_SUPPLIERS_BY_PRODUCT, &[])?;
        let mut suppliers = group_by_parent::<SupplierRow>(&links)?;

        Ok(products
            .into_iter()
            .map(|row| Product {
                categories: categories.remove(&row.id).unwrap_or_default(),
                suppliers: suppliers.remove(&row.id).unwrap_or_default(),
                row,
            })
            .collect())
    }

    fn insert_product(&self, new: &NewProduct) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let linked = self.pool.execute(
            INSERT_PRODUCT,
            &[&id, &new.name, &new.price, &new.stock, &new.category_ids],
        )?;
        if linked == 0 {
            return Err(StoreError::NotFound);
        }
        log::debug!(
            "inserted product {} ({}) in {} categor(ies)",
            new.name,
            id,
            linked
        );
        Ok(id)
    }
}

impl SupplierStore for PgCatalog {
    fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        let rows = self.pool.query_all(&SELECT_SUPPLIERS, &[])?;
        let suppliers: Vec<SupplierRow> = parse_rows(&rows)?;

        let links = self.pool.query_all(&SELECT_PRODUCTS_BY_SUPPLIER, &[])?;
        let mut products = group_by_parent::<ProductRow>(&links)?;

        Ok(suppliers
            .into_iter()
            .map(|row| Supplier {
                products: products.remove(&row.id).unwrap_or_default(),
                row,
            })
            .collect())
    }

    fn insert_supplier(&self, new: &NewSupplier) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let linked = self.pool.execute(
            INSERT_SUPPLIER,
            &[&id, &new.company_name, &new.tax_id, &new.product_ids],
        )?;
        log::debug!(
            "inserted supplier {} ({}) with {} product(s)",
            new.company_name,
            id,
            linked
        );
        Ok(id)
    }
}

impl CatalogStore for PgCatalog {
    fn ping(&self) -> Result<(), StoreError> {
        match self.pool.check_health()? {
            true => Ok(()),
            false => Err(StoreError::Unavailable("health query returned no row".to_string())),
        }
    }
}
