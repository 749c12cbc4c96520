//! Configuration file support for appdeps.
//!
//! appdeps supports two configuration file locations:
//! - Global: `~/.appdeps/config.toml` - User-wide defaults
//! - Project: `<app>/.appdeps/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. The `build`
//! section of the app's `package.json` takes precedence over both (see
//! [`crate::core::metadata::BuildMetadata`]).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// appdeps configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package manager settings
    pub npm: NpmConfig,

    /// Target runtime settings
    pub electron: ElectronConfig,
}

/// Package manager configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmConfig {
    /// Extra arguments for every install and rebuild
    pub args: Vec<String>,

    /// Don't pass --build-from-source
    pub skip_build_from_source: Option<bool>,
}

/// Target runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectronConfig {
    /// Electron version to build against
    pub version: Option<String>,

    /// Target architecture (x64, ia32, arm64, ...)
    pub arch: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if !other.npm.args.is_empty() {
            self.npm.args = other.npm.args;
        }
        if other.npm.skip_build_from_source.is_some() {
            self.npm.skip_build_from_source = other.npm.skip_build_from_source;
        }

        if other.electron.version.is_some() {
            self.electron.version = other.electron.version;
        }
        if other.electron.arch.is_some() {
            self.electron.arch = other.electron.arch;
        }
    }
}

/// Get the global appdeps config directory (~/.appdeps).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".appdeps"))
}

/// Get the global config path (~/.appdeps/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<app>/.appdeps/config.toml).
pub fn project_config_path(app_dir: &Path) -> PathBuf {
    app_dir.join(".appdeps").join("config.toml")
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.appdeps/config.toml)
/// 2. Global config (~/.appdeps/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    config.merge(Config::load_or_default(project_path));

    config
}
