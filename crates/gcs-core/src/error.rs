//! Error types for gcs-core

use thiserror::Error;

/// Core error type for the GCS database tooling
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: No connection string from flag, environment, or config file
    #[error(
        "[C004] No database connection string configured. Pass --database, set DATABASE_URL, \
         or add `database.url` to the config file"
    )]
    DatabaseUrlMissing,

    /// C005: IO error with file path context
    #[error("[C005] IO error on {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
