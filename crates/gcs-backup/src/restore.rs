//! Gated, all-or-nothing replay of a backup artifact.

use crate::artifact::read_schema_version;
use crate::error::{BackupError, BackupResult};
use crate::script::{split_statements, ScriptStatement};
use duckdb::Connection;
use gcs_core::MANAGED_TABLES;
use gcs_db::{relation_exists, table_row_count, Store};
use gcs_ledger::{is_recorded, ledger_head};
use std::fmt;
use std::path::PathBuf;

/// A restore request. `force` is the caller's confirmation that every row of
/// the managed tables may be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub artifact: PathBuf,
    pub force: bool,
}

/// Why a restore refused to start. The store is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingForce,
    ArtifactUnreadable { path: PathBuf, reason: String },
    MalformedArtifact { path: PathBuf, reason: String },
    /// The store has not applied the migration the artifact was taken at,
    /// or lacks a managed table
    SchemaBehind {
        required: Option<String>,
        head: Option<String>,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingForce => write!(
                f,
                "restore replaces every row of the managed tables; pass --force to confirm"
            ),
            Rejection::ArtifactUnreadable { path, reason } => {
                write!(f, "cannot read backup {}: {reason}", path.display())
            }
            Rejection::MalformedArtifact { path, reason } => {
                write!(f, "backup {} is not a usable script: {reason}", path.display())
            }
            Rejection::SchemaBehind { required, head } => write!(
                f,
                "store schema is behind the backup (backup needs {}, store is at {}); \
                 run `gcsdb migrate` first",
                required.as_deref().unwrap_or("the managed tables"),
                head.as_deref().unwrap_or("no migrations")
            ),
        }
    }
}

/// Row count of one managed table before and after a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCounts {
    pub table: &'static str,
    pub before: i64,
    pub after: i64,
}

/// A committed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Statements executed
    pub statements: usize,
    /// Transaction-control statements of the artifact that were not executed
    pub skipped: usize,
    pub tables: Vec<TableCounts>,
}

/// How a restore ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Rejected(Rejection),
    /// Statement `index` (1-based, among executed statements) failed and
    /// the transaction was rolled back
    RolledBack {
        index: usize,
        statement: String,
        error: String,
    },
    Committed(RestoreSummary),
}

impl RestoreOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, RestoreOutcome::Committed(_))
    }
}

/// Apply the gates that need no store: the force confirmation, then a
/// readable artifact. Returns the artifact text.
///
/// Callers that open the store themselves run this first so a rejected
/// request never creates or touches a database file.
pub fn read_request(request: &RestoreRequest) -> Result<String, Rejection> {
    if !request.force {
        log::warn!("Restore of {} refused: --force not given", request.artifact.display());
        return Err(Rejection::MissingForce);
    }
    std::fs::read_to_string(&request.artifact).map_err(|e| Rejection::ArtifactUnreadable {
        path: request.artifact.clone(),
        reason: e.to_string(),
    })
}

/// Replay the artifact named in `request` inside one transaction.
///
/// Nothing is read or written unless `request.force` is set. The artifact's
/// own `BEGIN`/`COMMIT` statements are skipped; the replay runs in a
/// transaction on a dedicated connection that commits only if every
/// statement succeeds. `Err` is reserved for store failures outside the
/// replayed statements.
pub fn restore(store: &Store, request: &RestoreRequest) -> BackupResult<RestoreOutcome> {
    let text = match read_request(request) {
        Ok(text) => text,
        Err(rejection) => return Ok(RestoreOutcome::Rejected(rejection)),
    };
    let malformed = |reason: String| {
        RestoreOutcome::Rejected(Rejection::MalformedArtifact {
            path: request.artifact.clone(),
            reason,
        })
    };

    let statements = match split_statements(&text) {
        Ok(statements) => statements,
        Err(e) => return Ok(malformed(e.to_string())),
    };
    let (control, body): (Vec<ScriptStatement>, Vec<ScriptStatement>) = statements
        .into_iter()
        .partition(|s| s.transaction_control);
    if body.is_empty() {
        return Ok(malformed("no statements to execute".to_string()));
    }

    if let Some(rejection) = check_schema(store, read_schema_version(&text))? {
        return Ok(RestoreOutcome::Rejected(rejection));
    }

    log::info!(
        "Restoring {} ({} statements)",
        request.artifact.display(),
        body.len()
    );

    let mut conn = store.dedicated()?;
    let before = count_rows(&conn)?;
    let tx = conn
        .transaction()
        .map_err(|e| BackupError::RestoreFailed(format!("BEGIN failed: {e}")))?;

    for (idx, statement) in body.iter().enumerate() {
        log::debug!("[{}/{}] {}", idx + 1, body.len(), statement.sql);
        if let Err(e) = tx.execute_batch(&statement.sql) {
            log::warn!("Statement {} failed, rolling back: {e}", idx + 1);
            if let Err(rollback_err) = tx.rollback() {
                log::warn!("Rollback reported an error: {rollback_err}");
            }
            return Ok(RestoreOutcome::RolledBack {
                index: idx + 1,
                statement: statement.sql.clone(),
                error: e.to_string(),
            });
        }
    }

    let after = count_rows(&tx)?;
    tx.commit()
        .map_err(|e| BackupError::RestoreFailed(format!("COMMIT failed: {e}")))?;

    let tables = MANAGED_TABLES
        .iter()
        .zip(before.into_iter().zip(after))
        .map(|(table, (before, after))| TableCounts {
            table: table.name,
            before,
            after,
        })
        .collect();

    Ok(RestoreOutcome::Committed(RestoreSummary {
        statements: body.len(),
        skipped: control.len(),
        tables,
    }))
}

/// Reject when a managed table is missing or the artifact's schema version
/// is not in the store's ledger.
fn check_schema(store: &Store, required: Option<String>) -> BackupResult<Option<Rejection>> {
    store.with_conn(|conn| {
        let tables_present = MANAGED_TABLES
            .iter()
            .map(|table| relation_exists(conn, table.name))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .all(|present| present);
        let version_recorded = match &required {
            Some(id) => is_recorded(conn, id)?,
            None => {
                log::warn!("Backup has no schema version; only table presence is checked");
                true
            }
        };
        if tables_present && version_recorded {
            return Ok(None);
        }
        Ok(Some(Rejection::SchemaBehind {
            required: required.clone(),
            head: ledger_head(conn)?,
        }))
    })
}

fn count_rows(conn: &Connection) -> BackupResult<Vec<i64>> {
    MANAGED_TABLES
        .iter()
        .map(|table| table_row_count(conn, table.name).map_err(BackupError::from))
        .collect()
}
