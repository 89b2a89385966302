//! Status command implementation

use anyhow::{Context, Result};
use gcs_core::MANAGED_TABLES;
use gcs_ledger::ledger_status;

use crate::cli::GlobalArgs;
use crate::commands::common::{load_config, open_store};

/// Execute the status command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(global, &config)?;
    let status = ledger_status(&store).context("Failed to read migration ledger")?;

    println!("Store: {}", store.target());
    println!();
    println!("Migrations:");
    for record in &status.applied {
        println!(
            "  ✓ [{}] {} (applied {})",
            record.id,
            record.name,
            record.executed_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    for unit in &status.pending {
        println!("  - [{}] {} (pending)", unit.id, unit.name);
    }
    for record in &status.unknown {
        println!("  ? [{}] {} (unknown to this build)", record.id, record.name);
    }

    println!();
    println!("Tables:");
    for table in MANAGED_TABLES {
        if store.relation_exists(table.name)? {
            println!("  {}: {} rows", table.name, store.table_row_count(table.name)?);
        } else {
            println!("  {}: missing", table.name);
        }
    }

    if !status.pending.is_empty() {
        println!();
        println!(
            "{} pending migration(s); run `gcsdb migrate`",
            status.pending.len()
        );
    }
    Ok(())
}
