//! Build metadata: how dependencies of an app should be installed.
//!
//! Metadata comes from two layers: the TOML config files (see
//! [`crate::util::config`]) and the `build` section of the app's
//! `package.json`, which takes precedence.

use std::path::Path;

use anyhow::{bail, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::manifest::PackageJson;
use crate::util::config::Config;

/// Flag asking node-pre-gyp based packages to compile instead of
/// downloading a prebuilt binary.
pub const BUILD_FROM_SOURCE: &str = "--build-from-source";

/// Packages whose version identifies the target Electron runtime.
const ELECTRON_PACKAGES: &[&str] = &["electron", "electron-prebuilt"];

/// A single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

/// The `build` section of an app's `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildMetadata {
    /// Extra arguments passed to the package manager
    pub npm_args: Option<OneOrMany>,

    /// Don't ask for native dependencies to be built from source
    pub npm_skip_build_from_source: Option<bool>,

    /// Target Electron version
    pub electron_version: Option<String>,
}

impl BuildMetadata {
    /// Build metadata from the TOML configuration layer.
    pub fn from_config(config: &Config) -> Self {
        BuildMetadata {
            npm_args: if config.npm.args.is_empty() {
                None
            } else {
                Some(OneOrMany::Many(config.npm.args.clone()))
            },
            npm_skip_build_from_source: config.npm.skip_build_from_source,
            electron_version: config.electron.version.clone(),
        }
    }

    /// Merge another metadata layer into this one (other takes precedence).
    pub fn merge(&mut self, other: BuildMetadata) {
        if other.npm_args.is_some() {
            self.npm_args = other.npm_args;
        }
        if other.npm_skip_build_from_source.is_some() {
            self.npm_skip_build_from_source = other.npm_skip_build_from_source;
        }
        if other.electron_version.is_some() {
            self.electron_version = other.electron_version;
        }
    }

    /// Configured package manager arguments.
    pub fn npm_args(&self) -> Vec<String> {
        self.npm_args.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }
}

/// Arguments appended to every install and rebuild invocation.
///
/// The configured arguments come first, followed by
/// [`BUILD_FROM_SOURCE`] unless explicitly disabled.
pub fn compute_extra_args(options: &BuildMetadata) -> Vec<String> {
    let mut args = options.npm_args();
    if options.npm_skip_build_from_source != Some(true) {
        args.push(BUILD_FROM_SOURCE.to_string());
    }
    args
}

/// Determine the Electron version an app targets.
///
/// An explicitly configured version wins. Otherwise the version of an
/// installed `electron` package is used, falling back to the range
/// requested in `package.json` with its `^`/`~` prefix removed.
pub fn electron_version(app_dir: &Path, manifest: &PackageJson, metadata: &BuildMetadata) -> Result<String> {
    if let Some(version) = &metadata.electron_version {
        return Ok(version.clone());
    }

    for name in ELECTRON_PACKAGES {
        let installed = app_dir.join("node_modules").join(name);
        if let Ok(pkg) = PackageJson::load(&installed) {
            if let Some(version) = pkg.version {
                tracing::debug!("Using installed {} {}", name, version);
                return Ok(version);
            }
        }
    }

    for name in ELECTRON_PACKAGES {
        if let Some(range) = manifest.requested_range(name) {
            let trimmed = range.trim().trim_start_matches(['^', '~', '=', 'v']);
            return match Version::parse(trimmed) {
                Ok(version) => Ok(version.to_string()),
                Err(_) => bail!(
                    "cannot compute electron version from `{}` in {} dependency\n\
                     help: set `electronVersion` in the `build` section of package.json",
                    range,
                    name
                ),
            };
        }
    }

    bail!(
        "cannot find electron dependency to get electron version in {}\n\
         help: pass --electron-version or set `electronVersion` in the `build` section",
        app_dir.join("package.json").display()
    )
}
