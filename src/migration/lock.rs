//! Advisory-lock based migration locking.
//!
//! Advisory locks belong to a session, so the guard must be built on a
//! single connection and every statement of the run must go through it.

use crate::executor::SqlExecutor;
use crate::migration::MigrationError;
use std::time::{Duration, Instant};

/// Key of the session advisory lock (`"stockroo"` as big-endian bytes).
pub const LOCK_KEY: i64 = 0x73746f636b726f6f;

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Holds the migration lock until dropped.
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> MigrationLockGuard<'a> {
    /// Polls `pg_try_advisory_lock` until it succeeds or `timeout_seconds` pass.
    pub fn acquire(
        executor: &'a dyn SqlExecutor,
        timeout_seconds: u64,
    ) -> Result<Self, MigrationError> {
        let start = Instant::now();
        let timeout = Duration::from_secs(timeout_seconds);

        loop {
            let row = executor.query_one("SELECT pg_try_advisory_lock($1)", &[&LOCK_KEY])?;
            let acquired: bool = row.try_get(0).map_err(|e| {
                MigrationError::Database(crate::executor::DbError::ParseError(e.to_string()))
            })?;
            if acquired {
                log::debug!("acquired migration lock after {:?}", start.elapsed());
                return Ok(Self { executor });
            }

            if start.elapsed() >= timeout {
                return Err(MigrationError::LockTimeout(format!(
                    "could not acquire advisory lock {} within {} seconds; \
                     another process may be running migrations",
                    LOCK_KEY, timeout_seconds
                )));
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn executor(&self) -> &'a dyn SqlExecutor {
        self.executor
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self
            .executor
            .execute("SELECT pg_advisory_unlock($1)", &[&LOCK_KEY])
        {
            log::warn!("failed to release migration lock: {}", e);
        }
    }
}
