//! Catalogue records as they leave the store.
//!
//! Field names follow the JSON contract consumed by the presentation layer,
//! hence the Portuguese `serde` renames. The `*Row` types are bare records;
//! [`Category`], [`Product`] and [`Supplier`] carry their loaded relations.

use may_postgres::Row;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Builds a value from a `may_postgres` row laid out by the store's queries.
pub trait FromRow: Sized {
    /// Reads columns starting at `offset`.
    fn from_row_at(row: &Row, offset: usize) -> Result<Self, may_postgres::Error>;

    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Self::from_row_at(row, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub id: Uuid,
    #[serde(rename = "nome_categoria")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub id: Uuid,
    #[serde(rename = "nome_produto")]
    pub name: String,
    #[serde(rename = "preco")]
    pub price: Decimal,
    #[serde(rename = "estoque")]
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierRow {
    pub id: Uuid,
    #[serde(rename = "nome_empresa")]
    pub company_name: String,
    #[serde(rename = "cnpj")]
    pub tax_id: Option<String>,
}

/// A category with the products filed under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    #[serde(flatten)]
    pub row: CategoryRow,
    #[serde(rename = "produtos")]
    pub products: Vec<ProductRow>,
}

/// A product with its categories and suppliers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    #[serde(flatten)]
    pub row: ProductRow,
    #[serde(rename = "categorias")]
    pub categories: Vec<CategoryRow>,
    #[serde(rename = "fornecedores")]
    pub suppliers: Vec<SupplierRow>,
}

/// A supplier with the products it furnishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Supplier {
    #[serde(flatten)]
    pub row: SupplierRow,
    #[serde(rename = "produtos_fornecidos")]
    pub products: Vec<ProductRow>,
}

impl FromRow for CategoryRow {
    fn from_row_at(row: &Row, offset: usize) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get(offset)?,
            name: row.try_get(offset + 1)?,
        })
    }
}

impl FromRow for ProductRow {
    fn from_row_at(row: &Row, offset: usize) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get(offset)?,
            name: row.try_get(offset + 1)?,
            price: row.try_get(offset + 2)?,
            stock: row.try_get(offset + 3)?,
        })
    }
}

impl FromRow for SupplierRow {
    fn from_row_at(row: &Row, offset: usize) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get(offset)?,
            company_name: row.try_get(offset + 1)?,
            tax_id: row.try_get(offset + 2)?,
        })
    }
}

/// Validated input for a new category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

/// Validated input for a new product.
///
/// `category_ids` may name rows that do not exist; the store attaches only
/// the ones it finds.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_ids: Vec<Uuid>,
}

/// Validated input for a new supplier. `tax_id` is never `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplier {
    pub company_name: String,
    pub tax_id: Option<String>,
    pub product_ids: Vec<Uuid>,
}
