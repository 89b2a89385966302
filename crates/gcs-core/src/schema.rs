//! Catalog of the row-bearing tables covered by backup and restore.
//!
//! The ledger creates these tables; the backup engine walks
//! [`MANAGED_TABLES`] in order when exporting, restoring, and reporting.

/// How a column is read out of the store and rendered back as a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `BIGINT` identifier allocated from the table's sequence
    Identifier,
    /// Free text
    Text,
    /// Exact decimal (`NUMERIC`), carried as its text form
    Numeric,
    /// Semi-structured value stored as canonical JSON text
    Json,
    /// `TIMESTAMP`, carried as its text form
    Timestamp,
}

/// A column of a managed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// A row-bearing table owned by the store.
#[derive(Debug, PartialEq, Eq)]
pub struct ManagedTable {
    /// Table name
    pub name: &'static str,
    /// Sequence that allocates the `id` column
    pub sequence: &'static str,
    /// Columns in export order; the first one is the primary key
    pub columns: &'static [Column],
}

impl ManagedTable {
    /// The primary key column.
    pub fn primary_key(&self) -> &Column {
        &self.columns[0]
    }
}

/// Completed mission logs.
pub static MISSION_LOGS: ManagedTable = ManagedTable {
    name: "mission_logs",
    sequence: "mission_logs_id_seq",
    columns: &[
        Column::new("id", ColumnKind::Identifier),
        Column::new("name", ColumnKind::Text),
        Column::new("date", ColumnKind::Text),
        Column::new("duration", ColumnKind::Text),
        Column::new("status", ColumnKind::Text),
        Column::new("location", ColumnKind::Text),
        Column::new("gps_track", ColumnKind::Json),
        Column::new("detected_sites", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
    ],
};

/// Saved mission plans.
pub static MISSION_PLANS: ManagedTable = ManagedTable {
    name: "mission_plans",
    sequence: "mission_plans_id_seq",
    columns: &[
        Column::new("id", ColumnKind::Identifier),
        Column::new("name", ColumnKind::Text),
        Column::new("altitude", ColumnKind::Numeric),
        Column::new("speed", ColumnKind::Numeric),
        Column::new("waypoints", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
    ],
};

/// Managed tables in backup order.
pub static MANAGED_TABLES: &[&ManagedTable] = &[&MISSION_LOGS, &MISSION_PLANS];
