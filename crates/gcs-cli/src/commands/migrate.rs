//! Migrate command implementation

use anyhow::{Context, Result};
use gcs_ledger::{run_catalog_with, LedgerError, UnitEvent, CATALOG};

use crate::cli::GlobalArgs;
use crate::commands::common::{load_config, open_store, ExitCode, EXIT_DATABASE};

/// Execute the migrate command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(global, &config)?;

    println!("Running migrations against {}", store.target());

    let result = run_catalog_with(&store, CATALOG, |unit, event| match event {
        UnitEvent::AlreadyApplied if global.verbose => {
            println!("  - [{}] {} (already applied)", unit.id, unit.name)
        }
        UnitEvent::Applied => println!("  ✓ [{}] {}", unit.id, unit.name),
        UnitEvent::AlreadyApplied | UnitEvent::Running => {}
    });

    match result {
        Ok(report) => {
            println!();
            if report.is_up_to_date() {
                println!("Schema is up to date ({} migrations)", report.total());
            } else {
                println!(
                    "Applied {} of {} migrations",
                    report.applied_count(),
                    report.total()
                );
            }
            Ok(())
        }
        Err(err @ (LedgerError::UnitFailed { .. } | LedgerError::RecordFailed { .. })) => {
            eprintln!("  ✗ {err}");
            eprintln!();
            eprintln!("Migration stopped. Fix the failing unit and run `gcsdb migrate` again.");
            Err(ExitCode(EXIT_DATABASE).into())
        }
        Err(err) => Err(err).context("Migration failed"),
    }
}
