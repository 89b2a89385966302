//! Error types for the migration ledger.

use gcs_db::DbError;
use thiserror::Error;

/// Migration ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The compiled-in catalog breaks its ordering rules (L001).
    #[error("[L001] Invalid migration catalog: {0}")]
    InvalidCatalog(String),

    /// The `_migrations` table could not be created or read (L002).
    #[error("[L002] Migration ledger unavailable: {0}")]
    LedgerTable(String),

    /// A unit's schema change failed; nothing was recorded for it (L003).
    #[error("[L003] Migration [{id}] {name} failed: {message}")]
    UnitFailed {
        id: String,
        name: String,
        message: String,
    },

    /// A unit applied but its ledger record could not be written (L004).
    #[error("[L004] Migration [{id}] applied but could not be recorded: {message}")]
    RecordFailed { id: String, message: String },

    /// Store access error (L005).
    #[error("[L005] {0}")]
    Db(#[from] DbError),
}

/// Result type alias for [`LedgerError`].
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<duckdb::Error> for LedgerError {
    fn from(err: duckdb::Error) -> Self {
        LedgerError::Db(DbError::from(err))
    }
}
