//! gcs-db - Store access layer for the GCS database tooling
//!
//! This crate turns a connection string into a [`Store`]: one shared
//! connection used for ordinary, independently-safe statements, and on demand
//! a dedicated connection for work that must stay inside a single
//! transaction. It also carries the reference helpers the application layer
//! uses to write mission rows.

pub mod connection;
pub mod error;
pub mod records;

pub use connection::{relation_exists, table_row_count, ConnectionTarget, Store};
pub use error::{DbError, DbResult};
pub use records::parse_timestamp_text;
