//! Reference catalogue of computer parts.
//!
//! Loaded through the services, so it is validated like any request.
//! Names are resolved to the generated ids after each stage; records that
//! already exist are skipped, which makes the seed safe to re-run.

use crate::service::{Catalog, ServiceError};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Category names. AMD and Kingston show products with several categories.
pub const CATEGORIES: [&str; 6] = [
    "Processador",
    "Placa de vídeo",
    "Memória Ram",
    "Armazenamento",
    "AMD",
    "Kingston",
];

pub struct SeedProduct {
    pub name: &'static str,
    pub price: u32,
    pub categories: &'static [&'static str],
}

pub const PRODUCTS: [SeedProduct; 4] = [
    SeedProduct {
        name: "Ryzen 5 5500",
        price: 600,
        categories: &["Processador", "AMD"],
    },
    SeedProduct {
        name: "RTX 4060",
        price: 2000,
        categories: &["Placa de vídeo"],
    },
    SeedProduct {
        name: "Kingston Fury 8GB",
        price: 150,
        categories: &["Memória Ram", "Kingston"],
    },
    SeedProduct {
        name: "SSD 120GB Kingston",
        price: 80,
        categories: &["Armazenamento", "Kingston"],
    },
];

pub struct SeedSupplier {
    pub company_name: &'static str,
    pub tax_id: &'static str,
    pub products: &'static [&'static str],
}

pub const SUPPLIERS: [SeedSupplier; 3] = [
    SeedSupplier {
        company_name: "Kabum",
        tax_id: "69128630000142",
        products: &["Ryzen 5 5500", "RTX 4060", "Kingston Fury 8GB"],
    },
    SeedSupplier {
        company_name: "Pichau",
        tax_id: "77944413000159",
        products: &["SSD 120GB Kingston", "Kingston Fury 8GB"],
    },
    SeedSupplier {
        company_name: "Terabyteshop",
        tax_id: "28653659000166",
        products: &["Kingston Fury 8GB", "RTX 4060"],
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

impl SeedReport {
    fn tally(&mut self, entity: &str, name: &str, result: Result<Uuid, ServiceError>) -> Result<(), ServiceError> {
        match result {
            Ok(_) => {
                self.created += 1;
                Ok(())
            }
            Err(ServiceError::Conflict(_)) => {
                log::info!("{entity} '{name}' already exists, skipping");
                self.skipped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Loads the reference catalogue.
pub fn seed(catalog: &Catalog) -> Result<SeedReport, ServiceError> {
    let mut report = SeedReport::default();

    for name in CATEGORIES {
        let result = catalog.categories.create(&json!({ "nome_categoria": name }));
        report.tally("category", name, result)?;
    }

    let category_ids: HashMap<String, Uuid> = catalog
        .categories
        .list()?
        .into_iter()
        .map(|c| (c.row.name, c.row.id))
        .collect();

    for product in &PRODUCTS {
        let categories: Vec<_> = product
            .categories
            .iter()
            .filter_map(|name| {
                category_ids
                    .get(*name)
                    .map(|id| json!({ "id": id.to_string(), "nome_categoria": name }))
            })
            .collect();
        let result = catalog.products.create(&json!({
            "nome_produto": product.name,
            "preco": product.price,
            "estoque": 0,
            "categorias": categories,
        }));
        report.tally("product", product.name, result)?;
    }

    let product_ids: HashMap<String, Uuid> = catalog
        .products
        .list()?
        .into_iter()
        .map(|p| (p.row.name, p.row.id))
        .collect();

    for supplier in &SUPPLIERS {
        let products: Vec<String> = supplier
            .products
            .iter()
            .filter_map(|name| product_ids.get(*name).map(Uuid::to_string))
            .collect();
        let result = catalog.suppliers.create(&json!({
            "nome_empresa": supplier.company_name,
            "cnpj": supplier.tax_id,
            "produtos": products,
        }));
        report.tally("supplier", supplier.company_name, result)?;
    }

    log::info!(
        "seed finished: {} created, {} skipped",
        report.created,
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCatalog;
    use crate::validation::ValidationRules;
    use std::sync::Arc;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(MemoryCatalog::new()), ValidationRules::default())
    }

    #[test]
    fn test_seed_links_everything() {
        let catalog = catalog();
        let report = seed(&catalog).unwrap();
        assert_eq!(report, SeedReport { created: 13, skipped: 0 });

        let products = catalog.products.list().unwrap();
        let fury = products
            .iter()
            .find(|p| p.row.name == "Kingston Fury 8GB")
            .unwrap();
        assert_eq!(fury.categories.len(), 2);
        assert_eq!(fury.suppliers.len(), 3);

        let suppliers = catalog.suppliers.list().unwrap();
        let kabum = suppliers.iter().find(|s| s.row.company_name == "Kabum").unwrap();
        assert_eq!(kabum.row.tax_id.as_deref(), Some("69128630000142"));
        assert_eq!(kabum.products.len(), 3);
    }

    #[test]
    fn test_seed_twice_skips_existing() {
        let catalog = catalog();
        seed(&catalog).unwrap();
        let report = seed(&catalog).unwrap();
        assert_eq!(report, SeedReport { created: 0, skipped: 13 });
        assert_eq!(catalog.categories.list().unwrap().len(), 6);
    }
}
