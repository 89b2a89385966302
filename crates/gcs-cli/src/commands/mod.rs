//! CLI command implementations

pub(crate) mod backup;
pub(crate) mod common;
pub(crate) mod migrate;
pub(crate) mod restore;
pub(crate) mod status;
