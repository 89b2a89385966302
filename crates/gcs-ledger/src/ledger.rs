//! Migration runner and ledger reads.
//!
//! Tracks applied unit ids in the `_migrations` table and applies any
//! unrecorded unit, in catalog order, on each run.

use crate::catalog::{validate_catalog, MigrationUnit, CATALOG};
use crate::error::{LedgerError, LedgerResult};
use chrono::NaiveDateTime;
use duckdb::Connection;
use gcs_db::{relation_exists, Store};
use std::collections::HashSet;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "_migrations";

/// One row of the ledger: proof that a unit was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub id: String,
    pub name: String,
    pub executed_at: NaiveDateTime,
}

/// What happened to a unit during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Applied and recorded by this run
    Applied,
    /// Already recorded; `apply` was not invoked
    AlreadyApplied,
}

/// Progress notification emitted while walking the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent {
    /// The unit is recorded and will be skipped
    AlreadyApplied,
    /// The unit's SQL is about to run
    Running,
    /// The unit ran and its record was written
    Applied,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// Every catalog unit, in catalog order, with what this run did to it
    pub units: Vec<(MigrationUnit, UnitOutcome)>,
}

impl MigrationReport {
    /// Number of units applied by this run.
    pub fn applied_count(&self) -> usize {
        self.units
            .iter()
            .filter(|(_, outcome)| *outcome == UnitOutcome::Applied)
            .count()
    }

    /// Catalog size.
    pub fn total(&self) -> usize {
        self.units.len()
    }

    /// Ids applied by this run, in apply order.
    pub fn applied_ids(&self) -> Vec<&'static str> {
        self.units
            .iter()
            .filter(|(_, outcome)| *outcome == UnitOutcome::Applied)
            .map(|(unit, _)| unit.id)
            .collect()
    }

    /// True when the run found nothing to do.
    pub fn is_up_to_date(&self) -> bool {
        self.applied_count() == 0
    }
}

/// Ledger state relative to a catalog.
#[derive(Debug, Clone)]
pub struct LedgerStatus {
    /// Recorded units that the catalog knows, ordered by id
    pub applied: Vec<LedgerRecord>,
    /// Catalog units with no record, in catalog order
    pub pending: Vec<MigrationUnit>,
    /// Recorded ids missing from the catalog (store migrated by a newer build)
    pub unknown: Vec<LedgerRecord>,
}

/// Ensure the `_migrations` table exists.
fn ensure_ledger_table(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
             id          VARCHAR(10) PRIMARY KEY,
             name        VARCHAR NOT NULL,
             executed_at TIMESTAMP NOT NULL DEFAULT now()
         );",
    )
    .map_err(|e| LedgerError::LedgerTable(format!("failed to create _migrations table: {e}")))?;
    Ok(())
}

/// Return the set of recorded unit ids.
fn applied_ids(conn: &Connection) -> LedgerResult<HashSet<String>> {
    let mut stmt = conn
        .prepare("SELECT id FROM _migrations ORDER BY id")
        .map_err(|e| LedgerError::LedgerTable(format!("failed to read applied ids: {e}")))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<HashSet<_>, _>>())
        .map_err(|e| LedgerError::LedgerTable(format!("failed to read applied ids: {e}")))?;
    Ok(ids)
}

/// Read every ledger record, ordered by id.
fn read_records(conn: &Connection) -> LedgerResult<Vec<LedgerRecord>> {
    let mut stmt = conn
        .prepare("SELECT id, name, CAST(executed_at AS VARCHAR) FROM _migrations ORDER BY id")
        .map_err(|e| LedgerError::LedgerTable(format!("failed to read ledger: {e}")))?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| LedgerError::LedgerTable(format!("failed to read ledger: {e}")))?;

    raw.into_iter()
        .map(|(id, name, executed_at)| -> LedgerResult<LedgerRecord> {
            Ok(LedgerRecord {
                id,
                name,
                executed_at: gcs_db::parse_timestamp_text(&executed_at)?,
            })
        })
        .collect()
}

/// Apply every unrecorded unit of the shipped catalog.
pub fn run_migrations(store: &Store) -> LedgerResult<MigrationReport> {
    run_catalog(store, CATALOG)
}

/// Apply every unrecorded unit of `catalog`.
pub fn run_catalog(store: &Store, catalog: &[MigrationUnit]) -> LedgerResult<MigrationReport> {
    run_catalog_with(store, catalog, |_, _| {})
}

/// Apply every unrecorded unit of `catalog`, reporting progress to
/// `on_event`.
///
/// Units run one after another on the shared connection. The first failing
/// unit stops the walk; it gets no ledger record, so the next run retries it.
/// Each unit's SQL and its ledger insert are separate statements: if the
/// insert fails the unit is applied again next time, which its
/// `IF NOT EXISTS` guards make harmless.
pub fn run_catalog_with<F>(
    store: &Store,
    catalog: &[MigrationUnit],
    mut on_event: F,
) -> LedgerResult<MigrationReport>
where
    F: FnMut(&MigrationUnit, UnitEvent),
{
    validate_catalog(catalog)?;

    store.with_conn(|conn| {
        ensure_ledger_table(conn)?;
        let applied = applied_ids(conn)?;

        let mut units = Vec::with_capacity(catalog.len());
        for unit in catalog {
            if applied.contains(unit.id) {
                log::debug!("Migration [{}] already applied", unit.id);
                on_event(unit, UnitEvent::AlreadyApplied);
                units.push((*unit, UnitOutcome::AlreadyApplied));
                continue;
            }

            log::info!("Applying migration [{}] {}", unit.id, unit.name);
            on_event(unit, UnitEvent::Running);

            conn.execute_batch(unit.sql)
                .map_err(|e| LedgerError::UnitFailed {
                    id: unit.id.to_string(),
                    name: unit.name.to_string(),
                    message: e.to_string(),
                })?;

            conn.execute(
                "INSERT INTO _migrations (id, name) VALUES (?, ?)",
                duckdb::params![unit.id, unit.name],
            )
            .map_err(|e| LedgerError::RecordFailed {
                id: unit.id.to_string(),
                message: e.to_string(),
            })?;

            on_event(unit, UnitEvent::Applied);
            units.push((*unit, UnitOutcome::Applied));
        }
        Ok(MigrationReport { units })
    })
}

/// Compare the ledger against the shipped catalog without changing anything.
pub fn ledger_status(store: &Store) -> LedgerResult<LedgerStatus> {
    ledger_status_for(store, CATALOG)
}

/// Compare the ledger against `catalog` without changing anything.
///
/// A store with no ledger table has every unit pending.
pub fn ledger_status_for(store: &Store, catalog: &[MigrationUnit]) -> LedgerResult<LedgerStatus> {
    store.with_conn(|conn| {
        let records = if relation_exists(conn, LEDGER_TABLE)? {
            read_records(conn)?
        } else {
            Vec::new()
        };

        let known: HashSet<&str> = catalog.iter().map(|u| u.id).collect();
        let recorded: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

        let pending = catalog
            .iter()
            .filter(|u| !recorded.contains(u.id))
            .copied()
            .collect();

        let (applied, unknown): (Vec<_>, Vec<_>) = records
            .iter()
            .cloned()
            .partition(|r| known.contains(r.id.as_str()));
        for record in &unknown {
            log::warn!(
                "Ledger records migration [{}] {} which this build does not know",
                record.id,
                record.name
            );
        }

        Ok(LedgerStatus {
            applied,
            pending,
            unknown,
        })
    })
}

/// Greatest recorded unit id, or `None` when nothing is recorded.
pub fn ledger_head(conn: &Connection) -> LedgerResult<Option<String>> {
    if !relation_exists(conn, LEDGER_TABLE)? {
        return Ok(None);
    }
    let head: Option<String> = conn
        .query_row("SELECT max(id) FROM _migrations", [], |row| row.get(0))
        .map_err(|e| LedgerError::LedgerTable(format!("failed to read ledger head: {e}")))?;
    Ok(head)
}

/// Whether unit `id` is recorded.
pub fn is_recorded(conn: &Connection, id: &str) -> LedgerResult<bool> {
    if !relation_exists(conn, LEDGER_TABLE)? {
        return Ok(false);
    }
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM _migrations WHERE id = ?",
            duckdb::params![id],
            |row| row.get(0),
        )
        .map_err(|e| LedgerError::LedgerTable(format!("failed to read ledger: {e}")))?;
    Ok(count > 0)
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
