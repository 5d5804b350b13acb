//! `MigrationRecord` - an entry in the `stockroom_migrations` state table

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Migration version (timestamp: YYYYMMDDHHMMSS)
    pub version: i64,

    pub name: String,

    /// SHA-256 of the migration's statements
    pub checksum: String,

    pub applied_at: DateTime<Utc>,

    /// Execution time in milliseconds (`None` if not recorded)
    pub execution_time_ms: Option<i32>,
}

impl MigrationRecord {
    /// Expected column order: `version`, `name`, `checksum`, `applied_at`, `execution_time_ms`
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            version: row.try_get(0)?,
            name: row.try_get(1)?,
            checksum: row.try_get(2)?,
            applied_at: row.try_get(3)?,
            execution_time_ms: row.try_get(4)?,
        })
    }
}
