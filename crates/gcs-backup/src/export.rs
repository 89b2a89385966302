//! Point-in-time export of the managed tables.

use crate::error::{BackupError, BackupResult};
use crate::value::{is_decimal_text, SqlValue};
use chrono::{DateTime, Utc};
use duckdb::Connection;
use gcs_core::sql_utils::quote_ident;
use gcs_core::{ColumnKind, ManagedTable, MANAGED_TABLES};
use gcs_db::Store;
use gcs_ledger::ledger_head;

/// Next value a table's identifier sequence will hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceState {
    pub name: &'static str,
    pub next_value: i64,
}

/// All rows of one managed table, ordered by primary key.
#[derive(Debug, Clone)]
pub struct TableDump {
    pub table: &'static ManagedTable,
    /// One entry per row, values in `table.columns` order
    pub rows: Vec<Vec<SqlValue>>,
    pub sequence: SequenceState,
}

/// Everything a backup artifact carries.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    /// Greatest applied migration id when the snapshot was taken
    pub schema_head: Option<String>,
    /// Dumps in [`MANAGED_TABLES`] order
    pub tables: Vec<TableDump>,
}

impl Snapshot {
    /// `(table, row count)` pairs in table order.
    pub fn row_counts(&self) -> Vec<(&'static str, usize)> {
        self.tables
            .iter()
            .map(|dump| (dump.table.name, dump.rows.len()))
            .collect()
    }

    /// Rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|dump| dump.rows.len()).sum()
    }
}

/// Read every managed table and its sequence inside one read snapshot.
///
/// Fails without side effects if any table or sequence cannot be read.
pub fn export_snapshot(store: &Store) -> BackupResult<Snapshot> {
    let taken_at = Utc::now();
    store.read_snapshot(|conn| {
        let schema_head = ledger_head(conn)?;
        let tables = MANAGED_TABLES
            .iter()
            .map(|table| dump_table(conn, table))
            .collect::<BackupResult<Vec<_>>>()?;
        let snapshot = Snapshot {
            taken_at,
            schema_head,
            tables,
        };
        log::info!(
            "Exported {} rows from {} tables (schema {})",
            snapshot.total_rows(),
            snapshot.tables.len(),
            snapshot.schema_head.as_deref().unwrap_or("none")
        );
        Ok(snapshot)
    })
}

/// Select expression for one column: numerics and timestamps are read as
/// text so their exact stored form survives.
fn select_expr(name: &str, kind: ColumnKind) -> String {
    match kind {
        ColumnKind::Numeric | ColumnKind::Timestamp => {
            format!("CAST({} AS VARCHAR)", quote_ident(name))
        }
        ColumnKind::Identifier | ColumnKind::Text | ColumnKind::Json => quote_ident(name),
    }
}

fn dump_table(conn: &Connection, table: &'static ManagedTable) -> BackupResult<TableDump> {
    let export_err = |e: duckdb::Error| BackupError::ExportFailed {
        table: table.name.to_string(),
        message: e.to_string(),
    };

    let select_list = table
        .columns
        .iter()
        .map(|c| select_expr(c.name, c.kind))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {select_list} FROM {} ORDER BY {}",
        quote_ident(table.name),
        quote_ident(table.primary_key().name)
    );
    log::debug!("{sql}");

    let mut stmt = conn.prepare(&sql).map_err(export_err)?;
    let mut rows = stmt.query([]).map_err(export_err)?;
    let mut dumped = Vec::new();
    while let Some(row) = rows.next().map_err(export_err)? {
        let mut values = Vec::with_capacity(table.columns.len());
        for (idx, column) in table.columns.iter().enumerate() {
            let value = if column.kind == ColumnKind::Identifier {
                row.get::<_, Option<i64>>(idx)
                    .map_err(export_err)?
                    .map_or(SqlValue::Null, SqlValue::Integer)
            } else {
                match row.get::<_, Option<String>>(idx).map_err(export_err)? {
                    None => SqlValue::Null,
                    Some(text) => typed_value(table, column.name, column.kind, text)?,
                }
            };
            values.push(value);
        }
        dumped.push(values);
    }

    let sequence = read_sequence(conn, table)?;
    log::debug!(
        "{}: {} rows, next id {}",
        table.name,
        dumped.len(),
        sequence.next_value
    );
    Ok(TableDump {
        table,
        rows: dumped,
        sequence,
    })
}

fn typed_value(
    table: &ManagedTable,
    column: &str,
    kind: ColumnKind,
    text: String,
) -> BackupResult<SqlValue> {
    let invalid = |message: String| BackupError::InvalidValue {
        table: table.name.to_string(),
        column: column.to_string(),
        message,
    };
    match kind {
        ColumnKind::Json => serde_json::from_str(&text)
            .map(SqlValue::Json)
            .map_err(|e| invalid(format!("not valid JSON: {e}"))),
        ColumnKind::Numeric if is_decimal_text(&text) => Ok(SqlValue::Numeric(text)),
        ColumnKind::Numeric => Err(invalid(format!("'{text}' is not a decimal"))),
        ColumnKind::Timestamp => Ok(SqlValue::Timestamp(text)),
        ColumnKind::Text | ColumnKind::Identifier => Ok(SqlValue::Text(text)),
    }
}

/// Read the next value of `table`'s sequence from the catalog.
fn read_sequence(conn: &Connection, table: &ManagedTable) -> BackupResult<SequenceState> {
    let state: Option<(Option<i64>, i64, i64)> = conn
        .query_row(
            "SELECT last_value, start_value, increment_by FROM duckdb_sequences() \
             WHERE schema_name = 'main' AND sequence_name = ?",
            duckdb::params![table.sequence],
            |row| Ok(Some((row.get(0)?, row.get(1)?, row.get(2)?))),
        )
        .or_else(|e| match e {
            duckdb::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })
        .map_err(|e| BackupError::ExportFailed {
            table: table.name.to_string(),
            message: format!("sequence {}: {e}", table.sequence),
        })?;

    let (last_value, start_value, increment_by) =
        state.ok_or_else(|| BackupError::ExportFailed {
            table: table.name.to_string(),
            message: format!("sequence {} does not exist", table.sequence),
        })?;

    Ok(SequenceState {
        name: table.sequence,
        next_value: last_value.map_or(start_value, |last| last + increment_by),
    })
}
