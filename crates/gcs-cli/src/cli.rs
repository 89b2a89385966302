//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gcsdb - schema migrations, backups and restores for the GCS mission database
#[derive(Parser, Debug)]
#[command(name = "gcsdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Store connection string (duckdb://<path>, a file path, or :memory:)
    #[arg(short, long, global = true, env = "DATABASE_URL")]
    pub database: Option<String>,

    /// Config file path [default: gcs.yml if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending schema migrations (safe to run on every deploy)
    Migrate,

    /// Write a data-only backup of the mission tables
    Backup(BackupArgs),

    /// Replace every mission row with the contents of a backup
    #[command(
        long_about = "Replace every mission row with the contents of a backup.\n\n\
                      The backup is replayed in a single transaction: either every statement \
                      succeeds and the result is committed, or nothing changes. Nothing is \
                      touched unless --force is given.\n\n\
                      Never run a restore while `gcsdb migrate` is running against the same \
                      database."
    )]
    Restore(RestoreArgs),

    /// Show applied and pending migrations and row counts
    Status,
}

/// Arguments for the backup command
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Directory to write the backup into [default: backup.dir, else "."]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the restore command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup file to replay
    pub file: PathBuf,

    /// Confirm that every row of the mission tables may be replaced
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
