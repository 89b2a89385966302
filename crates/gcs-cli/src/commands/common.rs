//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use gcs_core::Config;
use gcs_db::Store;
use std::fmt;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Exit code for a restore that refused to start.
pub(crate) const EXIT_REJECTED: i32 = 2;

/// Exit code for a failed migration unit or a rolled-back restore.
pub(crate) const EXIT_DATABASE: i32 = 4;

/// Load the config file named by `--config`, or `gcs.yml` when present.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    Config::load_or_default(global.config.as_deref()).context("Failed to load config")
}

/// Resolve the connection string and open the store.
pub(crate) fn open_store(global: &GlobalArgs, config: &Config) -> Result<Store> {
    let url = config.resolve_database_url(global.database.as_deref())?;
    let store = Store::connect(&url).with_context(|| format!("Failed to open store {url}"))?;
    log::info!("Opened store {}", store.target());
    Ok(store)
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
