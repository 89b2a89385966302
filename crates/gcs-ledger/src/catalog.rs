//! Embedded schema-change units.
//!
//! Each unit is a numbered `.sql` file embedded via `include_str!`. The
//! [`CATALOG`] slice is the apply order; later units may assume the schema
//! of earlier ones. Units are only ever appended, and every statement in a
//! unit must be safe to run twice (`IF NOT EXISTS`), because a unit whose
//! ledger record failed to write is applied again on the next run.

use crate::error::{LedgerError, LedgerResult};
use std::collections::HashSet;

/// A single schema-change unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationUnit {
    /// Zero-padded sequence number, e.g. `"001"`.
    pub id: &'static str,
    /// Human-readable description.
    pub name: &'static str,
    /// SQL executed as one batch.
    pub sql: &'static str,
}

/// All known units, in apply order.
pub static CATALOG: &[MigrationUnit] = &[
    MigrationUnit {
        id: "001",
        name: "Create mission_logs table",
        sql: include_str!("sql/001_create_mission_logs.sql"),
    },
    MigrationUnit {
        id: "002",
        name: "Create mission_plans table",
        sql: include_str!("sql/002_create_mission_plans.sql"),
    },
];

/// Longest id the `_migrations.id` column accepts.
pub const MAX_ID_LEN: usize = 10;

/// Check that ids are unique digit strings increasing both as text and as
/// numbers, so catalog order, lexical order and numeric order agree.
pub fn validate_catalog(catalog: &[MigrationUnit]) -> LedgerResult<()> {
    let mut seen = HashSet::new();
    let mut previous: Option<(&str, u64)> = None;

    for unit in catalog {
        if unit.id.is_empty()
            || unit.id.len() > MAX_ID_LEN
            || !unit.id.chars().all(|c| c.is_ascii_digit())
        {
            return Err(LedgerError::InvalidCatalog(format!(
                "id '{}' must be 1-{MAX_ID_LEN} ASCII digits",
                unit.id
            )));
        }
        if !seen.insert(unit.id) {
            return Err(LedgerError::InvalidCatalog(format!(
                "duplicate id '{}'",
                unit.id
            )));
        }

        let number: u64 = unit.id.parse().map_err(|_| {
            LedgerError::InvalidCatalog(format!("id '{}' is not a number", unit.id))
        })?;
        if let Some((prev_id, prev_number)) = previous {
            if unit.id <= prev_id || number <= prev_number {
                return Err(LedgerError::InvalidCatalog(format!(
                    "id '{}' does not sort after '{prev_id}'",
                    unit.id
                )));
            }
        }
        previous = Some((unit.id, number));
    }
    Ok(())
}
