//! In-process migration on startup

use crate::executor::SqlExecutor;
use crate::migration::{MigrationError, MigrationLockGuard, Migrator};

/// Applies pending migrations under the advisory lock.
///
/// Meant for application start: the first process takes the lock and
/// migrates, others wait up to `timeout_seconds` and then find nothing
/// pending. Any failure should stop the process from serving.
///
/// `executor` must be a single connection, not a pool.
pub fn startup_migrations(
    executor: &dyn SqlExecutor,
    timeout_seconds: u64,
) -> Result<usize, MigrationError> {
    let lock = MigrationLockGuard::acquire(executor, timeout_seconds)?;
    let applied = Migrator::default().up_with_lock(lock.executor())?;

    if applied > 0 {
        log::info!("Applied {} migration(s) on startup", applied);
    } else {
        log::debug!("No pending migrations to apply");
    }
    Ok(applied)
}
