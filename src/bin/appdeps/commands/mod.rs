//! Command implementations

pub mod completions;
pub mod deps;
pub mod install;
pub mod rebuild;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::cli::TargetArgs;
use appdeps::core::metadata::electron_version;
use appdeps::core::{compute_extra_args, BuildMetadata, PackageJson};
use appdeps::ops::{host_arch, InstallOptions};
use appdeps::util::config::{global_config_path, load_config, project_config_path};
use appdeps::util::fs::normalize_path;

/// Resolve the app directory, defaulting to the current directory.
pub fn app_dir(arg: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match arg {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    Ok(normalize_path(&dir))
}

/// Combine CLI flags, config files and `package.json` into install options.
///
/// CLI flags win over the `build` section of `package.json`, which wins
/// over project config, which wins over global config.
pub fn install_options(args: TargetArgs) -> Result<InstallOptions> {
    let app_dir = app_dir(args.app_dir)?;
    let manifest = PackageJson::load(&app_dir)?;
    let (metadata, config_arch) = build_metadata(&app_dir, &manifest)?;

    let version = match args.electron_version {
        Some(version) => version,
        None => electron_version(&app_dir, &manifest, &metadata)?,
    };
    let arch = args
        .arch
        .or(config_arch)
        .unwrap_or_else(|| host_arch().to_string());

    let mut extra_args = compute_extra_args(&metadata);
    extra_args.extend(args.extra_args);

    Ok(InstallOptions::new(app_dir, version)
        .arch(arch)
        .extra_args(extra_args))
}

fn build_metadata(app_dir: &Path, manifest: &PackageJson) -> Result<(BuildMetadata, Option<String>)> {
    let config = load_config(
        global_config_path().as_deref(),
        &project_config_path(app_dir),
    );

    let mut metadata = BuildMetadata::from_config(&config);
    metadata.merge(manifest.build_metadata()?);
    Ok((metadata, config.electron.arch))
}
