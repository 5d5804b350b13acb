//! Migration state table management

use crate::executor::{DbError, SqlExecutor};
use crate::migration::MigrationRecord;

pub const STATE_TABLE: &str = "stockroom_migrations";

/// Creates `stockroom_migrations` and its index if they don't exist.
pub fn initialize_state_table(executor: &dyn SqlExecutor) -> Result<(), DbError> {
    let sql = r#"
        CREATE TABLE IF NOT EXISTS stockroom_migrations (
            version BIGINT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            checksum VARCHAR(64) NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            execution_time_ms INTEGER
        )
    "#;
    executor.execute(sql, &[])?;

    let index_sql = r#"
        CREATE INDEX IF NOT EXISTS idx_stockroom_migrations_applied_at
        ON stockroom_migrations(applied_at)
    "#;
    executor.execute(index_sql, &[])?;

    Ok(())
}

/// Applied migrations, oldest first.
pub fn applied_migrations(executor: &dyn SqlExecutor) -> Result<Vec<MigrationRecord>, DbError> {
    let rows = executor.query_all(
        "SELECT version, name, checksum, applied_at, execution_time_ms \
         FROM stockroom_migrations ORDER BY version",
        &[],
    )?;
    rows.iter()
        .map(|row| MigrationRecord::from_row(row).map_err(|e| DbError::ParseError(e.to_string())))
        .collect()
}

pub fn record_migration(
    executor: &dyn SqlExecutor,
    version: i64,
    name: &str,
    checksum: &str,
    execution_time_ms: i32,
) -> Result<(), DbError> {
    executor.execute(
        "INSERT INTO stockroom_migrations (version, name, checksum, execution_time_ms) \
         VALUES ($1, $2, $3, $4)",
        &[&version, &name, &checksum, &execution_time_ms],
    )?;
    Ok(())
}
