//! gcs-core - Core library for the GCS database tooling
//!
//! This crate provides the configuration file and its resolution rules, the
//! catalog of managed tables that backups cover, the mission record types the
//! application layer writes, and SQL quoting helpers shared by the other
//! crates.

pub mod config;
pub mod error;
pub mod mission;
pub mod schema;
pub mod sql_utils;

pub use config::{BackupConfig, Config, DatabaseConfig};
pub use error::{CoreError, CoreResult};
pub use mission::{MissionLog, MissionPlan, NewMissionLog, NewMissionPlan};
pub use schema::{Column, ColumnKind, ManagedTable, MANAGED_TABLES};
