//! Error types for gcs-db

use thiserror::Error;

/// Store access errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Connection string names a backend we cannot open (D002)
    #[error("[D002] Unsupported connection string scheme '{0}' (expected duckdb://, a file path, or :memory:)")]
    UnsupportedScheme(String),

    /// Query execution error (D003)
    #[error("[D003] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Transaction management error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D005)
    #[error("[D005] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// A stored value could not be decoded (D006)
    #[error("[D006] Failed to decode stored value: {0}")]
    DecodeError(String),

    /// DuckDB driver error with preserved source chain (D007)
    #[error("[D007] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::DuckDb(err)
    }
}
