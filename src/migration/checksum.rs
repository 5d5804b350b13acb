//! Checksums over migration SQL

use crate::migration::MigrationError;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the statements, each terminated by `;\n`.
pub fn calculate_checksum(statements: &[String]) -> String {
    let mut hasher = Sha256::new();
    for statement in statements {
        hasher.update(statement.trim().as_bytes());
        hasher.update(b";\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Compares the checksum stored for an applied migration with the current one.
pub fn validate_checksum(
    version: i64,
    name: &str,
    stored: &str,
    current: &str,
) -> Result<(), MigrationError> {
    if stored == current {
        Ok(())
    } else {
        Err(MigrationError::ChecksumMismatch {
            version,
            name: name.to_string(),
            stored: stored.to_string(),
            current: current.to_string(),
        })
    }
}
