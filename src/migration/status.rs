//! Migration status tracking

use crate::migration::MigrationRecord;

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Applied migrations (from database)
    pub applied: Vec<MigrationRecord>,

    /// Compiled-in migrations not yet applied
    pub pending: Vec<PendingMigration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
}

impl MigrationStatus {
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        Self { applied, pending }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn latest_applied_version(&self) -> Option<i64> {
        self.applied.iter().map(|m| m.version).max()
    }
}
