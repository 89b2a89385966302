//! Error types for gcs-backup

use gcs_db::DbError;
use gcs_ledger::LedgerError;
use thiserror::Error;

/// Backup and restore errors.
///
/// Refusals to restore are not errors; they are reported as
/// [`crate::RestoreOutcome::Rejected`].
#[derive(Error, Debug)]
pub enum BackupError {
    /// Reading the store for an export failed (B001)
    #[error("[B001] Export of {table} failed: {message}")]
    ExportFailed { table: String, message: String },

    /// A stored value cannot be rendered as a literal (B002)
    #[error("[B002] Invalid value in {table}.{column}: {message}")]
    InvalidValue {
        table: String,
        column: String,
        message: String,
    },

    /// The artifact file could not be written (B003)
    #[error("[B003] Failed to write backup artifact {path}: {source}")]
    ArtifactWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Artifact text could not be split into statements (B004)
    #[error("[B004] Failed to tokenize backup artifact: {0}")]
    Tokenize(String),

    /// The restore transaction could not be opened or committed (B005)
    #[error("[B005] Restore failed: {0}")]
    RestoreFailed(String),

    /// Store access error (B006)
    #[error("[B006] {0}")]
    Db(#[from] DbError),

    /// Ledger read error (B007)
    #[error("[B007] {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type alias for [`BackupError`].
pub type BackupResult<T> = Result<T, BackupError>;
