//! Runtime configuration for hosts embedding the core.
//!
//! Values come from environment variables, falling back to defaults that
//! work without any setup:
//!
//! | variable             | default                                   |
//! |----------------------|-------------------------------------------|
//! | `TASKLANE_DB_PATH`   | `<temp dir>/tasklane.sqlite3`             |
//! | `TASKLANE_LOG_LEVEL` | `default_log_level()`                     |
//! | `TASKLANE_LOG_DIR`   | unset: file logging stays disabled        |

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TASKLANE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKLANE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKLANE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "tasklane.sqlite3";

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from).unwrap_or(defaults.db_path),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }
}
