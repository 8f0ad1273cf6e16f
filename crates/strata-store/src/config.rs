use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_core::serialize;

use crate::error::{Result, StoreError};

/// Configuration of a file-backed store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the snapshot file
    pub data_dir: PathBuf,

    /// Snapshot file name inside `data_dir`
    pub snapshot_name: String,

    /// fsync the snapshot before it replaces the previous one
    pub sync_on_commit: bool,

    /// Recompute and check the state root when a snapshot is loaded
    pub verify_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: PathBuf::from("./strata-data"),
            snapshot_name: "state.snapshot".to_string(),
            sync_on_commit: true,
            verify_on_open: true,
        }
    }
}

impl StoreConfig {
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Full path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_name)
    }

    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: StoreConfig = serialize::from_json(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serialize::to_json_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot_name.is_empty() {
            return Err(StoreError::Config("snapshot_name is empty".to_string()));
        }
        if Path::new(&self.snapshot_name).components().count() != 1 {
            return Err(StoreError::Config(format!(
                "snapshot_name must be a plain file name, got {:?}",
                self.snapshot_name
            )));
        }
        Ok(())
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn snapshot_name(mut self, name: impl Into<String>) -> Self {
        self.config.snapshot_name = name.into();
        self
    }

    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.config.sync_on_commit = sync;
        self
    }

    pub fn verify_on_open(mut self, verify: bool) -> Self {
        self.config.verify_on_open = verify;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
