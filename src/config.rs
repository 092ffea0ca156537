//! Configuration loading and management
//!
//! Handles parsing of `tasky.toml` in the data directory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::fields::{Language, SortKey};
use crate::storage::DEFAULT_QUOTA;

/// File name looked up inside the data directory.
pub const CONFIG_FILE: &str = "tasky.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Total bytes the store may hold across all keys
    #[serde(default = "default_quota")]
    pub quota_bytes: u64,

    /// Largest accepted import or restore file
    #[serde(default = "default_max_import")]
    pub max_import_bytes: usize,

    /// Sort order used by `list` when none is given
    #[serde(default)]
    pub default_sort: SortKey,

    /// Language used until one is chosen with `tasky lang`
    #[serde(default)]
    pub language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quota_bytes: default_quota(),
            max_import_bytes: default_max_import(),
            default_sort: SortKey::default(),
            language: Language::default(),
        }
    }
}

fn default_quota() -> u64 {
    DEFAULT_QUOTA
}

fn default_max_import() -> usize {
    5 * 1024 * 1024
}

impl Config {
    /// Load configuration from a `tasky.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.quota_bytes == 0 {
            return Err(Error::InvalidConfig("quota_bytes must be positive".to_string()));
        }
        if self.max_import_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_import_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_from_dir_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.quota_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn load_from_dir_reads_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            "default_sort = \"priority\"\nlanguage = \"uk\"\n",
        )
        .expect("write config");

        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.default_sort, SortKey::Priority);
        assert_eq!(cfg.language, Language::Uk);
        assert_eq!(cfg.max_import_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "quota_bytes = 0\n").expect("write config");
        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
        assert_eq!(Config::load_from_dir(dir.path()), Config::default());

        fs::write(&path, "default_sort = [").expect("write config");
        assert_eq!(Config::load_from_dir(dir.path()), Config::default());
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let cfg = Config {
            default_sort: SortKey::Deadline,
            ..Config::default()
        };
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("default_sort = \"deadline\""));
        assert_eq!(Config::load(&path).expect("reload"), cfg);
    }
}
