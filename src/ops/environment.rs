//! Process environment for native builds.
//!
//! node-gyp keeps downloaded runtime headers under the user's home
//! directory. Builds for a target runtime get a dedicated home so those
//! headers don't mix with the ones used for the developer's own Node.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::util::env::Environment;

/// Where Electron headers are downloaded from.
pub const ELECTRON_DIST_URL: &str = "https://atom.io/download/electron";

/// Runtime name understood by node-gyp and node-pre-gyp.
pub const ELECTRON_RUNTIME: &str = "electron";

/// Name of the isolated home directory, relative to the user's home.
pub const GYP_HOME_DIR: &str = ".electron-gyp";

const DISTURL_VAR: &str = "npm_config_disturl";
const TARGET_VAR: &str = "npm_config_target";
const RUNTIME_VAR: &str = "npm_config_runtime";
const ARCH_VAR: &str = "npm_config_arch";
const HOME_VARS: &[&str] = &["HOME", "USERPROFILE"];

/// The isolated home used for native builds (`~/.electron-gyp`).
pub fn gyp_home() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(GYP_HOME_DIR))
        .ok_or_else(|| anyhow!("could not determine home directory"))
}

/// The host CPU architecture, named the way Node names it.
pub fn host_arch() -> &'static str {
    node_arch(std::env::consts::ARCH)
}

/// Translate a Rust architecture name into Node's naming.
pub fn node_arch(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Environment handed to spawned package manager processes.
///
/// Built from the ambient environment with a fixed overlay; it cannot be
/// changed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: Environment,
}

impl BuildEnvironment {
    /// Environment for installing dependencies against a target runtime.
    ///
    /// Every ambient variable is kept; the target variables and the home
    /// directory variables are overridden.
    pub fn for_target(ambient: &Environment, gyp_home: &Path, runtime_version: &str, arch: &str) -> Self {
        let mut env = Self::for_rebuild(ambient, gyp_home);
        env.vars.insert(DISTURL_VAR, ELECTRON_DIST_URL);
        env.vars.insert(TARGET_VAR, runtime_version);
        env.vars.insert(RUNTIME_VAR, ELECTRON_RUNTIME);
        env.vars.insert(ARCH_VAR, arch);
        env
    }

    /// Environment for rebuilding: only the home directory is redirected,
    /// the target is passed as command line flags instead.
    pub fn for_rebuild(ambient: &Environment, gyp_home: &Path) -> Self {
        let mut vars = ambient.clone();
        for key in HOME_VARS {
            vars.insert(*key, gyp_home.as_os_str());
        }
        BuildEnvironment { vars }
    }

    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key)
    }

    /// Get a variable as stored.
    pub fn get_os(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get_os(key)
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter()
    }
}
