//! Migration-specific error types

use crate::executor::DbError;

#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error
    Database(DbError),
    /// Checksum mismatch
    ChecksumMismatch {
        version: i64,
        name: String,
        stored: String,
        current: String,
    },
    /// Migration lock timeout
    LockTimeout(String),
    /// Migration failed during execution
    ExecutionFailed {
        version: i64,
        name: String,
        error: String,
    },
    /// Applied in the database but unknown to this build
    UnknownVersion { version: i64, name: String },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::ChecksumMismatch {
                version,
                name,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) has been modified after being applied.\n\
                     Stored checksum: {}\n\
                     Current checksum: {}",
                    name, version, stored, current
                )
            }
            MigrationError::LockTimeout(msg) => write!(f, "Migration lock timeout: {}", msg),
            MigrationError::ExecutionFailed { version, name, error } => {
                write!(
                    f,
                    "Migration '{}' (version {}) failed during execution: {}",
                    name, version, error
                )
            }
            MigrationError::UnknownVersion { version, name } => {
                write!(
                    f,
                    "Migration '{}' (version {}) is applied but not part of this build.\n\
                     The database was migrated by a newer release.",
                    name, version
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<DbError> for MigrationError {
    fn from(error: DbError) -> Self {
        MigrationError::Database(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_names_both_checksums() {
        let err = MigrationError::ChecksumMismatch {
            version: 20240601000000,
            name: "create_catalog".to_string(),
            stored: "aaa".to_string(),
            current: "bbb".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("create_catalog"));
        assert!(text.contains("Stored checksum: aaa"));
        assert!(text.contains("Current checksum: bbb"));
    }
}
