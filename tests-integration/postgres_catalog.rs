//! PostgreSQL store and migrations against a real database.
//!
//! Set `STOCKROOM_TEST_DATABASE_URL` to run these; without it every test
//! returns early. Each test migrates into its own schema and drops it
//! afterwards, so tests can run in parallel against one database.

use serde_json::json;
use std::sync::{Arc, Barrier};
use stockroom::connection::connect;
use stockroom::migration::{
    startup_migrations, MigrationError, MigrationLockGuard, Migrator, SchemaManager,
};
use stockroom::store::{CategoryStore, ProductStore};
use stockroom::{
    Catalog, DbPool, PgCatalog, PgExecutor, ServiceError, SqlExecutor, StoreError,
    ValidationRules,
};
use uuid::Uuid;

const DATABASE_URL_VAR: &str = "STOCKROOM_TEST_DATABASE_URL";

/// A migrated, throwaway schema on a single connection.
struct TestSchema {
    pool: Arc<DbPool>,
    name: String,
    url: String,
}

impl TestSchema {
    fn create() -> Option<Self> {
        let url = match std::env::var(DATABASE_URL_VAR) {
            Ok(url) => url,
            Err(_) => {
                eprintln!("{DATABASE_URL_VAR} not set, skipping");
                return None;
            }
        };
        let executor = PgExecutor::new(connect(&url).expect("connect to test database"));
        let name = format!("stockroom_test_{}", Uuid::new_v4().simple());
        executor
            .execute(&format!("CREATE SCHEMA {name}"), &[])
            .expect("create schema");
        executor
            .execute(&format!("SET search_path TO {name}"), &[])
            .expect("set search_path");

        let pool = Arc::new(DbPool::from_executors(vec![executor]));
        Some(Self { pool, name, url })
    }

    /// A second session on the same schema.
    fn open_session(&self) -> PgExecutor {
        let executor = PgExecutor::new(connect(&self.url).expect("connect to test database"));
        executor
            .execute(&format!("SET search_path TO {}", self.name), &[])
            .expect("set search_path");
        executor
    }

    fn executor(&self) -> &PgExecutor {
        self.pool.primary().expect("one connection")
    }

    fn migrate(&self) -> usize {
        startup_migrations(self.executor(), 30).expect("migrations apply")
    }

    fn catalog(&self) -> Catalog {
        Catalog::new(
            Arc::new(PgCatalog::new(self.pool.clone())),
            ValidationRules::default(),
        )
    }
}

impl Drop for TestSchema {
    fn drop(&mut self) {
        let _ = self
            .pool
            .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.name), &[]);
    }
}

#[test]
fn migrations_create_every_table_once() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    assert_eq!(schema.migrate(), 1);
    assert_eq!(schema.migrate(), 0);

    let manager = SchemaManager::new(schema.executor());
    for table in [
        "categories",
        "products",
        "suppliers",
        "product_categories",
        "supplier_products",
        "stockroom_migrations",
    ] {
        assert!(manager.has_table(table).unwrap(), "missing {table}");
    }

    let status = Migrator::default().status(schema.executor()).unwrap();
    assert!(status.is_up_to_date());
    assert_eq!(status.applied.len(), 1);
    assert_eq!(status.applied[0].name, "create_catalog");
}

#[test]
fn edited_migration_is_detected() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    schema.migrate();
    schema
        .executor()
        .execute("UPDATE stockroom_migrations SET checksum = 'edited'", &[])
        .unwrap();

    let err = Migrator::default().status(schema.executor()).unwrap_err();
    assert!(matches!(err, MigrationError::ChecksumMismatch { .. }), "{err}");
}

#[test]
fn catalogue_round_trip() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    schema.migrate();
    let catalog = schema.catalog();
    assert!(catalog.ping().is_ok());

    let cpu = catalog
        .categories
        .create(&json!({ "nome_categoria": "Processador" }))
        .unwrap();
    let amd = catalog
        .categories
        .create(&json!({ "nome_categoria": "AMD" }))
        .unwrap();
    assert!(matches!(
        catalog.categories.create(&json!({ "nome_categoria": "AMD" })),
        Err(ServiceError::Conflict(_))
    ));

    let ryzen = catalog
        .products
        .create(&json!({
            "nome_produto": "Ryzen 5 5500",
            "preco": 600.5,
            "estoque": 7,
            "categorias": [
                { "id": cpu.to_string(), "nome_categoria": "Processador" },
                { "id": amd.to_string(), "nome_categoria": "AMD" },
                { "id": Uuid::new_v4().to_string(), "nome_categoria": "Fantasma" },
            ],
        }))
        .unwrap();

    catalog
        .suppliers
        .create(&json!({ "nome_empresa": "Kabum", "cnpj": "", "produtos": [ryzen.to_string()] }))
        .unwrap();
    catalog
        .suppliers
        .create(&json!({ "nome_empresa": "Pichau", "cnpj": "77944413000159" }))
        .unwrap();
    assert!(matches!(
        catalog
            .suppliers
            .create(&json!({ "nome_empresa": "Terabyteshop", "cnpj": "77944413000159" })),
        Err(ServiceError::Conflict(_))
    ));

    let products = catalog.products.list().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].row.price, rust_decimal::Decimal::new(6005, 1));
    let names: Vec<&str> = products[0]
        .categories
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["AMD", "Processador"]);
    assert_eq!(products[0].suppliers.len(), 1);
    assert_eq!(products[0].suppliers[0].tax_id, None);

    let categories = catalog.categories.list().unwrap();
    assert!(categories.iter().all(|c| c.products.len() == 1));

    let suppliers = catalog.suppliers.list().unwrap();
    assert_eq!(suppliers.len(), 2);
    assert_eq!(suppliers[0].row.company_name, "Kabum");
    assert_eq!(suppliers[0].products[0].id, ryzen);
    assert!(suppliers[1].products.is_empty());
}

#[test]
fn product_without_existing_category_writes_nothing() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    schema.migrate();
    let store = PgCatalog::new(schema.pool.clone());

    let err = store
        .insert_product(&stockroom::model::NewProduct {
            name: "RTX 4060".to_string(),
            price: rust_decimal::Decimal::from(2000),
            stock: 1,
            category_ids: vec![Uuid::new_v4()],
        })
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
    assert!(store.list_products().unwrap().is_empty());
    assert!(store.list_categories().unwrap().is_empty());
}

#[test]
fn unknown_applied_version_is_reported() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    schema.migrate();

    let err = Migrator::new(Vec::new()).status(schema.executor()).unwrap_err();
    match err {
        MigrationError::UnknownVersion { name, .. } => assert_eq!(name, "create_catalog"),
        other => panic!("expected UnknownVersion, got {other}"),
    }
}

#[test]
fn held_migration_lock_times_out_other_sessions() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    let other = schema.open_session();

    let guard = MigrationLockGuard::acquire(schema.executor(), 30).unwrap();
    let err = MigrationLockGuard::acquire(&other, 1).err().expect("lock is held");
    assert!(matches!(err, MigrationError::LockTimeout(_)), "{err}");

    drop(guard);
    assert!(MigrationLockGuard::acquire(&other, 30).is_ok());
}

#[test]
fn concurrent_starters_apply_each_migration_once() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    let sessions = [schema.open_session(), schema.open_session()];
    let barrier = Barrier::new(sessions.len());

    let applied: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = sessions
            .iter()
            .map(|session| {
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    startup_migrations(session, 30).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(applied, 1);
    assert!(Migrator::default()
        .status(schema.executor())
        .unwrap()
        .is_up_to_date());
}

#[test]
fn racing_creates_yield_one_conflict_free_winner() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    schema.migrate();
    let catalog = schema.catalog();
    let racers = 6;
    let barrier = Barrier::new(racers);

    let results: Vec<Result<Uuid, ServiceError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..racers)
            .map(|_| {
                let (catalog, barrier) = (&catalog, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    catalog
                        .categories
                        .create(&json!({ "nome_categoria": "Placa-mãe" }))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::Conflict(_))));
    assert_eq!(catalog.categories.list().unwrap().len(), 1);
}

#[test]
fn price_beyond_column_range_is_rejected_before_the_database() {
    let Some(schema) = TestSchema::create() else {
        return;
    };
    schema.migrate();
    let catalog = schema.catalog();
    let cpu = catalog
        .categories
        .create(&json!({ "nome_categoria": "Processador" }))
        .unwrap();

    let body = |price: f64| {
        json!({
            "nome_produto": "Ryzen 9 7950X",
            "preco": price,
            "estoque": 1,
            "categorias": [{ "id": cpu.to_string(), "nome_categoria": "Processador" }],
        })
    };
    assert!(matches!(
        catalog.products.create(&body(1e16)),
        Err(ServiceError::Validation(_))
    ));
    catalog.products.create(&body(999_999_999_999_999.0)).unwrap();

    let products = catalog.products.list().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(
        products[0].row.price,
        rust_decimal::Decimal::from(999_999_999_999_999i64)
    );
}
