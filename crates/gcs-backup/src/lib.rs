//! gcs-backup - Backup and restore engine for the GCS database
//!
//! [`backup`] reads every managed table in one read snapshot and writes a
//! data-only SQL artifact that never overwrites an earlier one. [`restore`]
//! replays such an artifact, only when explicitly forced, as a single
//! transaction that either commits completely or leaves the store as it was.

pub mod artifact;
pub mod error;
pub mod export;
pub mod restore;
pub mod script;
pub mod value;

pub use artifact::{
    artifact_file_name, backup, read_schema_version, render_artifact, write_artifact,
    BackupOptions, BackupReport,
};
pub use error::{BackupError, BackupResult};
pub use export::{export_snapshot, SequenceState, Snapshot, TableDump};
pub use restore::{
    read_request, restore, Rejection, RestoreOutcome, RestoreRequest, RestoreSummary, TableCounts,
};
pub use script::{split_statements, ScriptStatement};
pub use value::{canonical_json, SqlValue};
