//! SchemaManager - runs migration statements and inspects the schema

use crate::executor::{DbError, SqlExecutor};
use crate::migration::Migration;

pub struct SchemaManager<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn SqlExecutor) -> Self {
        Self { executor }
    }

    /// Runs a DDL statement.
    pub fn execute(&self, sql: &str) -> Result<(), DbError> {
        self.executor.execute(sql, &[]).map(|_| ())
    }

    /// Runs every statement of `migration` in order.
    pub fn apply(&self, migration: &dyn Migration) -> Result<(), DbError> {
        for statement in migration.statements() {
            self.execute(&statement)?;
        }
        Ok(())
    }

    /// Whether a table exists in the current schema.
    pub fn has_table(&self, table: &str) -> Result<bool, DbError> {
        let row = self.executor.query_one(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
            &[&table],
        )?;
        row.try_get(0)
            .map_err(|e| DbError::ParseError(e.to_string()))
    }
}
