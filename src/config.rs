// Store configuration

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "taskflow";
const DEFAULT_DB_FILE: &str = "taskflow.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Where and how the store opens its database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding the database file
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub db_file: String,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Schema version to migrate to; newest when unset
    pub schema_version: Option<u32>,
    /// Keep everything in memory (nothing touches disk)
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: DEFAULT_DB_FILE.to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            schema_version: None,
            in_memory: false,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading store config");

        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("failed to read {}: {}", path.display(), e)))?;

        Self::from_yaml(&content).map_err(|e| match e {
            StoreError::Config(msg) => StoreError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> StoreResult<Self> {
        // An empty file means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Config for a store rooted at the given directory
    pub fn at<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = Some(version);
        self
    }

    /// Full path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".taskflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.db_file, "taskflow.db");
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.schema_version, None);
        assert!(!config.in_memory);
        assert!(config.db_path().ends_with("taskflow.db"));
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = StoreConfig::from_yaml("data_dir: /tmp/tf\nschema_version: 1\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tf"));
        assert_eq!(config.schema_version, Some(1));
        assert_eq!(config.db_file, "taskflow.db");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/tf/taskflow.db"));
    }

    #[test]
    fn test_from_yaml_empty_is_default() {
        assert_eq!(StoreConfig::from_yaml("  \n").unwrap(), StoreConfig::default());
    }

    #[test]
    fn test_from_yaml_rejects_unknown_keys() {
        let err = StoreConfig::from_yaml("colour: blue\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("taskflow.yaml");
        fs::write(&path, "in_memory: true\nbusy_timeout_ms: 100\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert!(config.in_memory);
        assert_eq!(config.busy_timeout_ms, 100);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = StoreConfig::load(temp.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }
}
