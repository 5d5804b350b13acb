//! Migrator - compares compiled-in migrations with the state table and
//! applies what is pending.

use crate::executor::SqlExecutor;
use crate::migration::state_table::{applied_migrations, initialize_state_table, record_migration};
use crate::migration::{
    checksum::validate_checksum, Migration, MigrationError, MigrationStatus, PendingMigration,
    SchemaManager,
};
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new(crate::migration::all())
    }
}

impl Migrator {
    pub fn new(mut migrations: Vec<Box<dyn Migration>>) -> Self {
        migrations.sort_by_key(|m| m.version());
        Self { migrations }
    }

    /// Applied vs pending, validating checksums of applied migrations.
    pub fn status(&self, executor: &dyn SqlExecutor) -> Result<MigrationStatus, MigrationError> {
        initialize_state_table(executor)?;
        let applied = applied_migrations(executor)?;

        for record in &applied {
            match self.migrations.iter().find(|m| m.version() == record.version) {
                Some(migration) => validate_checksum(
                    record.version,
                    &record.name,
                    &record.checksum,
                    &migration.checksum(),
                )?,
                None => {
                    return Err(MigrationError::UnknownVersion {
                        version: record.version,
                        name: record.name.clone(),
                    })
                }
            }
        }

        let pending = self
            .migrations
            .iter()
            .filter(|m| !applied.iter().any(|r| r.version == m.version()))
            .map(|m| PendingMigration {
                version: m.version(),
                name: m.name().to_string(),
                checksum: m.checksum(),
            })
            .collect();

        Ok(MigrationStatus::new(applied, pending))
    }

    /// Applies pending migrations in version order. The caller must hold
    /// the migration lock on `executor`'s session.
    pub fn up_with_lock(&self, executor: &dyn SqlExecutor) -> Result<usize, MigrationError> {
        let status = self.status(executor)?;
        let manager = SchemaManager::new(executor);
        let mut applied = 0;

        for pending in &status.pending {
            let Some(migration) = self
                .migrations
                .iter()
                .find(|m| m.version() == pending.version)
            else {
                continue;
            };

            #[cfg(feature = "tracing")]
            let _span = tracing_helpers::migration_span(pending.version).entered();

            let start = Instant::now();
            manager
                .apply(migration.as_ref())
                .map_err(|e| MigrationError::ExecutionFailed {
                    version: pending.version,
                    name: pending.name.clone(),
                    error: e.to_string(),
                })?;
            let elapsed_ms = i32::try_from(start.elapsed().as_millis()).unwrap_or(i32::MAX);

            record_migration(
                executor,
                pending.version,
                &pending.name,
                &pending.checksum,
                elapsed_ms,
            )?;
            log::info!(
                "applied migration {} ({}) in {} ms",
                pending.version,
                pending.name,
                elapsed_ms
            );
            applied += 1;
        }

        Ok(applied)
    }
}
