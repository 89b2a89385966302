//! Store connection wrapper.
//!
//! [`Store`] owns the shared DuckDB [`Connection`] that ledger and export work
//! runs on, and hands out dedicated connections to the same database for work
//! that must keep one transaction on one connection (restore).

use crate::error::{DbError, DbResult};
use duckdb::Connection;
use gcs_core::sql_utils::{is_plain_identifier, quote_ident};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// Private in-memory database
    Memory,
    /// Database file
    File(PathBuf),
}

impl ConnectionTarget {
    /// Parse a connection string.
    ///
    /// Accepts `:memory:`, `duckdb::memory:`, `duckdb://<path>`,
    /// `duckdb:<path>`, or a bare file path. Any other `scheme://` is rejected.
    pub fn parse(url: &str) -> DbResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DbError::ConnectionError(
                "connection string is empty".to_string(),
            ));
        }

        if matches!(url, ":memory:" | "duckdb::memory:" | "duckdb://:memory:") {
            return Ok(Self::Memory);
        }

        if let Some(rest) = url
            .strip_prefix("duckdb://")
            .or_else(|| url.strip_prefix("duckdb:"))
        {
            if rest.is_empty() {
                return Err(DbError::ConnectionError(format!(
                    "connection string '{url}' has no database path"
                )));
            }
            return Ok(Self::File(PathBuf::from(rest)));
        }

        if let Some((scheme, _)) = url.split_once("://") {
            return Err(DbError::UnsupportedScheme(scheme.to_string()));
        }

        Ok(Self::File(PathBuf::from(url)))
    }

    fn open(&self) -> DbResult<Connection> {
        match self {
            Self::Memory => {
                Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))
            }
            Self::File(path) => Connection::open(path)
                .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display()))),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, ":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connection to the store.
///
/// Single shared connection behind a `Mutex`; the tooling is a sequential
/// batch job, so there is never more than one caller waiting on it.
pub struct Store {
    target: ConnectionTarget,
    conn: Mutex<Connection>,
}

impl Store {
    /// Open the store named by `url` and check that it answers.
    pub fn connect(url: &str) -> DbResult<Self> {
        let target = ConnectionTarget::parse(url)?;
        Self::open(target)
    }

    /// Open a private in-memory store.
    ///
    /// Useful for unit tests that don't need persistence.
    pub fn in_memory() -> DbResult<Self> {
        Self::open(ConnectionTarget::Memory)
    }

    /// Open a store backed by the database file at `path`.
    pub fn from_path(path: &Path) -> DbResult<Self> {
        Self::open(ConnectionTarget::File(path.to_path_buf()))
    }

    fn open(target: ConnectionTarget) -> DbResult<Self> {
        log::debug!("Opening store at {target}");
        let conn = target.open()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
            .map_err(|e| DbError::ConnectionError(format!("store did not answer: {e}")))?;
        Ok(Self {
            target,
            conn: Mutex::new(conn),
        })
    }

    /// Where this store lives.
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Run `body` against the shared connection.
    pub fn with_conn<F, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.lock()?;
        body(&conn)
    }

    /// Execute read-only `body` inside a transaction that is always rolled
    /// back, so every read in `body` sees the same point-in-time state.
    pub fn read_snapshot<F, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&conn);

        if let Err(e) = conn.execute_batch("ROLLBACK") {
            log::warn!("Failed to release read snapshot: {e}");
        }
        result
    }

    /// Open a second connection to the same database.
    ///
    /// The caller owns it exclusively; it is closed when dropped. Transaction
    /// state is per connection, so anything that must commit or roll back as
    /// one unit runs on a dedicated connection instead of the shared one.
    pub fn dedicated(&self) -> DbResult<Connection> {
        let conn = self.lock()?;
        conn.try_clone()
            .map_err(|e| DbError::ConnectionError(format!("dedicated connection: {e}")))
    }

    /// Check if a table exists in the main schema.
    pub fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.with_conn(|conn| relation_exists(conn, name))
    }

    /// Row count of `table`.
    pub fn table_row_count(&self, table: &str) -> DbResult<i64> {
        self.with_conn(|conn| table_row_count(conn, table))
    }
}

/// Check if a table exists in the main schema.
pub fn relation_exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_name = ?",
            duckdb::params![name],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(format!("relation lookup for {name}: {e}")))?;
    Ok(count > 0)
}

/// Get the row count for a table.
pub fn table_row_count(conn: &Connection, table: &str) -> DbResult<i64> {
    if !is_plain_identifier(table) {
        return Err(DbError::ExecutionError(format!(
            "invalid table name '{table}': must contain only alphanumeric characters and underscores"
        )));
    }
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(format!("count failed for {table}: {e}")))?;
    Ok(count)
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
