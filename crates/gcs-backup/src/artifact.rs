//! Backup artifact rendering and file placement.
//!
//! An artifact is a data-only SQL script: a comment header, then inside one
//! `BEGIN TRANSACTION; ... COMMIT;` block a reset and literal inserts per
//! managed table, then a block advancing every identifier sequence to its
//! captured next value.

use crate::error::{BackupError, BackupResult};
use crate::export::{export_snapshot, SequenceState, Snapshot};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use gcs_core::config::BackupConfig;
use gcs_core::sql_utils::{quote_ident, quote_literal};
use gcs_db::Store;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

/// Header line naming the ledger head the artifact was taken at.
pub const SCHEMA_VERSION_TAG: &str = "-- Schema-Version:";

/// Placeholder written when the source store had no ledger.
const NO_SCHEMA_VERSION: &str = "none";

/// Give up looking for a free file name after this many one-millisecond steps.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Render `snapshot` as a replayable SQL script.
pub fn render_artifact(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let counts = snapshot
        .row_counts()
        .into_iter()
        .map(|(table, rows)| format!("{table} ({rows} rows)"))
        .collect::<Vec<_>>()
        .join(", ");

    // Writing to a String cannot fail
    let _ = writeln!(out, "-- GCS database backup");
    let _ = writeln!(
        out,
        "-- Created: {}",
        snapshot.taken_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(
        out,
        "{SCHEMA_VERSION_TAG} {}",
        snapshot.schema_head.as_deref().unwrap_or(NO_SCHEMA_VERSION)
    );
    let _ = writeln!(out, "-- Tables: {counts}");
    let _ = writeln!(
        out,
        "-- WARNING: data only. Restoring deletes every row of the tables above"
    );
    let _ = writeln!(
        out,
        "-- and needs a store migrated to at least the schema version shown."
    );
    out.push('\n');
    out.push_str("BEGIN TRANSACTION;\n");

    for dump in &snapshot.tables {
        let table = quote_ident(dump.table.name);
        let columns = dump
            .table
            .columns
            .iter()
            .map(|c| quote_ident(c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let _ = writeln!(out, "\n-- {}", dump.table.name);
        let _ = writeln!(out, "DELETE FROM {table};");
        for row in &dump.rows {
            let values = row
                .iter()
                .map(|v| v.to_literal())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "INSERT INTO {table} ({columns}) VALUES ({values});");
        }
    }

    out.push_str("\n-- sequences\n");
    for dump in &snapshot.tables {
        let _ = writeln!(out, "{};", advance_sequence_sql(&dump.sequence));
    }
    out.push_str("\nCOMMIT;\n");
    out
}

/// Statement that calls `nextval` until the sequence's next value is
/// `state.next_value`.
///
/// Sequences are bound as column defaults and cannot be dropped, so they are
/// only moved forward. A sequence already at or past the captured value is
/// left alone: every restored id is below that value, so later inserts
/// cannot collide.
fn advance_sequence_sql(state: &SequenceState) -> String {
    format!(
        "SELECT nextval({name}) FROM range(1, {next}) AS r(i) \
         WHERE i > (SELECT coalesce(last_value, start_value - increment_by) \
         FROM duckdb_sequences() WHERE schema_name = 'main' AND sequence_name = {name})",
        name = quote_literal(state.name),
        next = state.next_value,
    )
}

/// Artifact file name for a backup taken at `at`:
/// `<prefix>_<ISO-8601 with ':' and '.' replaced by '-'>.sql`.
pub fn artifact_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{prefix}_{stamp}.sql")
}

/// Schema version recorded in an artifact's header, if any.
///
/// Only the leading comment block is searched.
pub fn read_schema_version(artifact: &str) -> Option<String> {
    artifact
        .lines()
        .map(str::trim)
        .take_while(|line| line.is_empty() || line.starts_with("--"))
        .find_map(|line| line.strip_prefix(SCHEMA_VERSION_TAG))
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != NO_SCHEMA_VERSION)
        .map(str::to_string)
}

/// Write `snapshot` under `dir` without ever replacing an existing file.
///
/// The name is derived from the snapshot time; if it is taken, the time is
/// advanced one millisecond at a time until a free name is found. A file
/// that fails mid-write is removed.
pub fn write_artifact(dir: &Path, prefix: &str, snapshot: &Snapshot) -> BackupResult<PathBuf> {
    let text = render_artifact(snapshot);
    let write_err = |path: &Path, source: std::io::Error| BackupError::ArtifactWrite {
        path: path.display().to_string(),
        source,
    };

    fs::create_dir_all(dir).map_err(|e| write_err(dir, e))?;

    for step in 0..MAX_NAME_ATTEMPTS {
        let at = snapshot.taken_at + Duration::milliseconds(step);
        let path = dir.join(artifact_file_name(prefix, at));

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying the next millisecond", path.display());
                continue;
            }
            Err(e) => return Err(write_err(&path, e)),
        };

        if let Err(e) = file.write_all(text.as_bytes()).and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(remove_err) = fs::remove_file(&path) {
                log::warn!(
                    "Failed to remove partial artifact {}: {remove_err}",
                    path.display()
                );
            }
            return Err(write_err(&path, e));
        }
        log::info!("Wrote backup artifact {}", path.display());
        return Ok(path);
    }

    Err(write_err(
        dir,
        std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free artifact name after {MAX_NAME_ATTEMPTS} attempts"),
        ),
    ))
}

/// Where and under what name `backup` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub dir: PathBuf,
    pub prefix: String,
}

impl From<&BackupConfig> for BackupOptions {
    fn from(config: &BackupConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            prefix: config.prefix.clone(),
        }
    }
}

/// What a finished backup wrote.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub path: PathBuf,
    pub schema_head: Option<String>,
    pub row_counts: Vec<(&'static str, usize)>,
}

/// Export the store and write the artifact.
///
/// No file is created if the export fails.
pub fn backup(store: &Store, options: &BackupOptions) -> BackupResult<BackupReport> {
    let snapshot = export_snapshot(store)?;
    let path = write_artifact(&options.dir, &options.prefix, &snapshot)?;
    Ok(BackupReport {
        path,
        row_counts: snapshot.row_counts(),
        schema_head: snapshot.schema_head,
    })
}
