//! Infrastructure: loads the YAML configuration file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::config::RemediationConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "REMEDIATE_CONFIG";

/// Reads `RemediationConfig` from a YAML file on disk.
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Use `explicit` if given, otherwise `REMEDIATE_CONFIG`, otherwise the
    /// per-user config directory.
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    /// Load the config file. A missing default file yields the defaults; a
    /// missing file named by `--config` or `REMEDIATE_CONFIG` is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an explicit
    /// path does not exist.
    pub fn load(&self) -> Result<RemediationConfig> {
        if let Some(path) = &self.explicit {
            return read_config(path);
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return read_config(Path::new(&val));
        }
        let Some(path) = self.path() else {
            return Ok(RemediationConfig::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(RemediationConfig::default());
        }
        read_config(&path)
    }

    /// Resolved config file path, if any can be determined.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(val));
        }
        dirs::config_dir().map(|d| d.join("remediate").join("config.yaml"))
    }
}

fn read_config(path: &Path) -> Result<RemediationConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
}
