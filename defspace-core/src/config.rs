//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment flag toggling reload-every-call for a whole space
pub const RELOAD_ENV_VAR: &str = "RELOAD_DEFs";

/// Optional configuration file looked up in the space directory
pub const CONFIG_FILE_NAME: &str = "defspace.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// How a deferred binding resolves its definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Load on first use, then replace the binding with the loaded value
    #[default]
    LoadOnce,
    /// Re-execute the definition file on every use
    Reload,
}

/// Settings for importing a space, matching defspace.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    #[serde(default)]
    pub reload: bool,

    /// Directories starting with this prefix are skipped (caches, internals)
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,

    /// Extension of definition files, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_reserved_prefix() -> String {
    String::from("_")
}

fn default_extension() -> String {
    String::from("def")
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            reload: false,
            reserved_prefix: default_reserved_prefix(),
            extension: default_extension(),
        }
    }
}

impl SpaceConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: SpaceConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults overlaid with the `RELOAD_DEFs` environment flag
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Configuration for a space: `explicit` file if given, otherwise
    /// `<space>/defspace.yml` when present, otherwise defaults. The
    /// environment flag is applied last.
    pub fn load(space_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = space_root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    tracing::debug!("Using config {}", candidate.display());
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Read `RELOAD_DEFs` once; an enabled flag forces reload mode
    pub fn with_env_overrides(mut self) -> Self {
        let flag = std::env::var(RELOAD_ENV_VAR).ok();
        if reload_flag_enabled(flag.as_deref()) {
            self.reload = true;
        }
        self
    }

    pub fn policy(&self) -> ReloadPolicy {
        if self.reload {
            ReloadPolicy::Reload
        } else {
            ReloadPolicy::LoadOnce
        }
    }

    pub fn is_reserved(&self, dir_name: &str) -> bool {
        !self.reserved_prefix.is_empty() && dir_name.starts_with(&self.reserved_prefix)
    }

    /// File name a directory must contain to define `dir_name`
    pub fn definition_file_name(&self, dir_name: &str) -> String {
        format!("{}.{}", dir_name, self.extension)
    }
}

/// Interpret the value of the reload environment flag
pub fn reload_flag_enabled(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "0" | "false" | "no" | "off"),
    }
}
