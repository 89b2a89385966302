//! Configuration types and parsing for gcs.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gcs.yml";

/// Default file name prefix for backup artifacts.
pub const DEFAULT_BACKUP_PREFIX: &str = "gcs_db_backup";

/// Main configuration from gcs.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Store connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Backup artifact placement
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string (`duckdb://path`, a bare path, or `:memory:`)
    #[serde(default)]
    pub url: Option<String>,
}

/// Where `backup` writes its artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Output directory, relative to the working directory
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Artifact file name prefix
    #[serde(default = "default_backup_prefix")]
    pub prefix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            prefix: default_backup_prefix(),
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_backup_prefix() -> String {
    DEFAULT_BACKUP_PREFIX.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        // An empty file deserializes to `null`, which means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file if present.
    ///
    /// An explicit path must exist. Without one, a missing `gcs.yml` in the
    /// working directory yields the default configuration.
    pub fn load_or_default(explicit: Option<&Path>) -> CoreResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if let Some(url) = &self.database.url {
            if url.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "database.url cannot be empty".to_string(),
                });
            }
        }

        let prefix = &self.backup.prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "backup.prefix '{prefix}' must be non-empty and contain only alphanumeric characters, '_' or '-'"
                ),
            });
        }

        Ok(())
    }

    /// Resolve the connection string.
    ///
    /// `cli` carries the `--database` flag or `DATABASE_URL` (clap folds the
    /// environment into the flag); it wins over `database.url` from the file.
    pub fn resolve_database_url(&self, cli: Option<&str>) -> CoreResult<String> {
        cli.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.database.url.clone())
            .ok_or(CoreError::DatabaseUrlMissing)
    }

    /// Resolve the backup output directory, preferring an explicit override.
    pub fn resolve_backup_dir(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .unwrap_or_else(|| self.backup.dir.clone())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
