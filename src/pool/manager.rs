//! Round-robin pool of `may_postgres` clients.
//!
//! Each client is a pipelined connection that many coroutines can share, so
//! the pool never checks connections in and out: it only spreads statements
//! across `max_connections` clients.

use crate::connection::{connect, ConnectionError};
use crate::executor::{DbError, PgExecutor, SqlExecutor};
use crate::pool::config::DatabaseConfig;
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct DbPool {
    executors: Vec<PgExecutor>,
    next: AtomicUsize,
}

impl DbPool {
    /// Opens `max_connections` connections (at least one).
    pub fn connect(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let size = config.max_connections.max(1);
        let mut executors = Vec::with_capacity(size);
        for _ in 0..size {
            executors.push(PgExecutor::new(connect(&config.url)?));
        }
        log::info!("opened {} PostgreSQL connection(s)", size);
        Ok(Self::from_executors(executors))
    }

    pub fn from_executors(executors: Vec<PgExecutor>) -> Self {
        Self {
            executors,
            next: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.executors.len()
    }

    fn pick(&self) -> Result<&PgExecutor, DbError> {
        if self.executors.is_empty() {
            return Err(DbError::Unavailable("connection pool is empty".to_string()));
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.executors.len();
        Ok(&self.executors[index])
    }

    /// Pings one connection.
    pub fn check_health(&self) -> Result<bool, DbError> {
        self.pick()?.check_health()
    }

    /// The first connection, for session-scoped work such as advisory locks.
    pub fn primary(&self) -> Option<&PgExecutor> {
        self.executors.first()
    }
}

impl SqlExecutor for DbPool {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, DbError> {
        self.pick()?.execute(query, params)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, DbError> {
        self.pick()?.query_all(query, params)
    }
}
