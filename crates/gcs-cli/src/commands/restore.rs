//! Restore command implementation

use anyhow::{Context, Result};
use gcs_backup::{read_request, restore, Rejection, RestoreOutcome, RestoreRequest};

use crate::cli::{GlobalArgs, RestoreArgs};
use crate::commands::common::{load_config, open_store, ExitCode, EXIT_DATABASE, EXIT_REJECTED};

/// Execute the restore command
pub(crate) fn execute(args: &RestoreArgs, global: &GlobalArgs) -> Result<()> {
    let request = RestoreRequest {
        artifact: args.file.clone(),
        force: args.force,
    };
    // Refuse before the store is even opened
    if let Err(rejection) = read_request(&request) {
        return refuse(&rejection);
    }

    let config = load_config(global)?;
    let store = open_store(global, &config)?;

    println!(
        "Restoring {} into {}",
        args.file.display(),
        store.target()
    );

    match restore(&store, &request).context("Restore failed")? {
        RestoreOutcome::Committed(summary) => {
            println!(
                "✓ Restore committed ({} statements)",
                summary.statements
            );
            for counts in &summary.tables {
                println!(
                    "  {}: {} -> {} rows",
                    counts.table, counts.before, counts.after
                );
            }
            Ok(())
        }
        RestoreOutcome::Rejected(rejection) => refuse(&rejection),
        RestoreOutcome::RolledBack {
            index,
            statement,
            error,
        } => {
            eprintln!("✗ Statement {index} failed; every change was rolled back");
            eprintln!("  Statement: {statement}");
            eprintln!("  Error: {error}");
            Err(ExitCode(EXIT_DATABASE).into())
        }
    }
}

fn refuse(rejection: &Rejection) -> Result<()> {
    eprintln!("✗ Restore refused: {rejection}");
    Err(ExitCode(EXIT_REJECTED).into())
}

#[cfg(test)]
#[path = "restore_test.rs"]
mod tests;
