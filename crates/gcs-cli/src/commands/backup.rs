//! Backup command implementation

use anyhow::{Context, Result};
use gcs_backup::{backup, BackupOptions};

use crate::cli::{BackupArgs, GlobalArgs};
use crate::commands::common::{load_config, open_store};

/// Execute the backup command
pub(crate) fn execute(args: &BackupArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(global, &config)?;

    let options = BackupOptions {
        dir: config.resolve_backup_dir(args.output_dir.as_deref()),
        ..BackupOptions::from(&config.backup)
    };
    let report = backup(&store, &options).context("Backup failed")?;

    println!("✓ Backup written to {}", report.path.display());
    for (table, rows) in &report.row_counts {
        println!("  {table}: {rows} rows");
    }
    println!(
        "  schema version: {}",
        report.schema_head.as_deref().unwrap_or("none")
    );
    Ok(())
}
