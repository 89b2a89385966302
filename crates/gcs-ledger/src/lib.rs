//! Schema migration ledger for the GCS database.
//!
//! [`CATALOG`] is the ordered list of schema-change units. The runner records
//! each applied unit in the `_migrations` table and, on later runs, skips
//! every unit whose id is already recorded, so running it on every deploy is
//! safe.

pub mod catalog;
pub mod error;
pub mod ledger;

pub use catalog::{validate_catalog, MigrationUnit, CATALOG};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{
    is_recorded, ledger_head, ledger_status, ledger_status_for, run_catalog, run_catalog_with,
    run_migrations, LedgerRecord, LedgerStatus, MigrationReport, UnitEvent, UnitOutcome,
    LEDGER_TABLE,
};
