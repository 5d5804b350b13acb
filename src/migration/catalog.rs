//! Initial catalogue schema: three entity tables and two join tables.

use crate::migration::Migration;
use sea_query::{
    ColumnDef, Expr, ExprTrait, ForeignKey, ForeignKeyAction, Index, PostgresQueryBuilder, Table,
};

pub struct CreateCatalog;

impl Migration for CreateCatalog {
    fn name(&self) -> &str {
        "create_catalog"
    }

    fn version(&self) -> i64 {
        20240601000000
    }

    fn statements(&self) -> Vec<String> {
        let categories = Table::create()
            .table("categories")
            .if_not_exists()
            .col(ColumnDef::new("id").uuid().not_null().primary_key())
            .col(ColumnDef::new("name").string().not_null())
            .index(Index::create().unique().name("categories_name_key").col("name"))
            .to_owned();

        let products = Table::create()
            .table("products")
            .if_not_exists()
            .col(ColumnDef::new("id").uuid().not_null().primary_key())
            .col(ColumnDef::new("name").string().not_null())
            .col(ColumnDef::new("price").decimal_len(19, 4).not_null())
            .col(
                ColumnDef::new("stock")
                    .integer()
                    .not_null()
                    .default(0)
                    .check(Expr::col("stock").gte(0)),
            )
            .index(Index::create().unique().name("products_name_key").col("name"))
            .to_owned();

        let suppliers = Table::create()
            .table("suppliers")
            .if_not_exists()
            .col(ColumnDef::new("id").uuid().not_null().primary_key())
            .col(ColumnDef::new("company_name").string().not_null())
            .col(
                ColumnDef::new("tax_id")
                    .string_len(14)
                    .null()
                    .check(Expr::cust("tax_id ~ '^[0-9]{14}$'")),
            )
            .index(
                Index::create()
                    .unique()
                    .name("suppliers_company_name_key")
                    .col("company_name"),
            )
            .index(Index::create().unique().name("suppliers_tax_id_key").col("tax_id"))
            .to_owned();

        let product_categories = Table::create()
            .table("product_categories")
            .if_not_exists()
            .col(ColumnDef::new("product_id").uuid().not_null())
            .col(ColumnDef::new("category_id").uuid().not_null())
            .primary_key(Index::create().col("product_id").col("category_id"))
            .foreign_key(
                ForeignKey::create()
                    .name("product_categories_product_id_fkey")
                    .from("product_categories", "product_id")
                    .to("products", "id")
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("product_categories_category_id_fkey")
                    .from("product_categories", "category_id")
                    .to("categories", "id")
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();

        let supplier_products = Table::create()
            .table("supplier_products")
            .if_not_exists()
            .col(ColumnDef::new("supplier_id").uuid().not_null())
            .col(ColumnDef::new("product_id").uuid().not_null())
            .primary_key(Index::create().col("supplier_id").col("product_id"))
            .foreign_key(
                ForeignKey::create()
                    .name("supplier_products_supplier_id_fkey")
                    .from("supplier_products", "supplier_id")
                    .to("suppliers", "id")
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("supplier_products_product_id_fkey")
                    .from("supplier_products", "product_id")
                    .to("products", "id")
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();

        // Reverse lookups for the list queries
        let by_category = Index::create()
            .if_not_exists()
            .name("idx_product_categories_category_id")
            .table("product_categories")
            .col("category_id")
            .to_owned();
        let by_product = Index::create()
            .if_not_exists()
            .name("idx_supplier_products_product_id")
            .table("supplier_products")
            .col("product_id")
            .to_owned();

        vec![
            categories.build(PostgresQueryBuilder),
            products.build(PostgresQueryBuilder),
            suppliers.build(PostgresQueryBuilder),
            product_categories.build(PostgresQueryBuilder),
            supplier_products.build(PostgresQueryBuilder),
            by_category.build(PostgresQueryBuilder),
            by_product.build(PostgresQueryBuilder),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_created_in_dependency_order() {
        let statements = CreateCatalog.statements();
        assert_eq!(statements.len(), 7);
        let order = [
            "\"categories\"",
            "\"products\"",
            "\"suppliers\"",
            "\"product_categories\"",
            "\"supplier_products\"",
        ];
        for (statement, table) in statements.iter().zip(order) {
            assert!(statement.starts_with("CREATE TABLE IF NOT EXISTS"), "{statement}");
            assert!(statement.contains(table), "{statement}");
        }
    }

    #[test]
    fn test_unique_keys_and_foreign_keys() {
        let sql = CreateCatalog.statements().join(";\n");
        for constraint in [
            "categories_name_key",
            "products_name_key",
            "suppliers_company_name_key",
            "suppliers_tax_id_key",
            "product_categories_category_id_fkey",
            "supplier_products_product_id_fkey",
        ] {
            assert!(sql.contains(constraint), "missing {constraint}");
        }
        assert!(sql.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn test_checksum_is_deterministic() {
        assert_eq!(CreateCatalog.checksum(), CreateCatalog.checksum());
    }
}
