//! Installing and rebuilding app dependencies for a target runtime.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::reader::{installed_reader, InstalledReader};
use crate::ops::environment::{gyp_home, host_arch, BuildEnvironment};
use crate::ops::error::StepError;
use crate::ops::flatten::dependencies;
use crate::ops::invocation::{
    install_invocation, rebuild_invocation, InvocationPlan, Platform, Spawner, ToolContext,
};
use crate::ops::native::{filter_native, FsProbe, Probe};
use crate::util::env::Environment;
use crate::util::process::ProcessSpawner;

/// What to install or rebuild, and for which target.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// App directory (contains `package.json`)
    pub app_dir: PathBuf,

    /// Target Electron version
    pub electron_version: String,

    /// Target CPU architecture, in Node naming
    pub arch: String,

    /// Arguments appended to every package manager invocation
    pub extra_args: Vec<String>,
}

impl InstallOptions {
    /// Options targeting the host architecture with no extra arguments.
    pub fn new(app_dir: impl Into<PathBuf>, electron_version: impl Into<String>) -> Self {
        InstallOptions {
            app_dir: app_dir.into(),
            electron_version: electron_version.into(),
            arch: host_arch().to_string(),
            extra_args: Vec::new(),
        }
    }

    /// Set the target architecture.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Set the extra arguments.
    pub fn extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }
}

/// Runs installs and rebuilds through pluggable collaborators.
pub struct Rebuilder<'a> {
    reader: &'a dyn InstalledReader,
    probe: &'a dyn Probe,
    spawner: &'a dyn Spawner,
    ambient: Environment,
    platform: Platform,
    gyp_home: PathBuf,
    progress: bool,
}

impl<'a> Rebuilder<'a> {
    /// Create a rebuilder for the current platform.
    pub fn new(
        reader: &'a dyn InstalledReader,
        probe: &'a dyn Probe,
        spawner: &'a dyn Spawner,
        ambient: Environment,
        gyp_home: impl Into<PathBuf>,
    ) -> Self {
        Rebuilder {
            reader,
            probe,
            spawner,
            ambient,
            platform: Platform::current(),
            gyp_home: gyp_home.into(),
            progress: false,
        }
    }

    /// Plan executables for another platform.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Show a progress bar while rebuilding.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Install production dependencies of the app for the target.
    pub fn install_dependencies(&self, opts: &InstallOptions) -> Result<()> {
        tracing::info!(
            "Installing app dependencies for arch {} to {}",
            opts.arch,
            opts.app_dir.display()
        );

        let env = BuildEnvironment::for_target(
            &self.ambient,
            &self.gyp_home,
            &opts.electron_version,
            &opts.arch,
        );
        let context = ToolContext::detect(&self.ambient);
        let template = install_invocation(&context, self.platform, &self.ambient, env, &opts.extra_args);

        self.run(&template.plan_for(&opts.app_dir))
    }

    /// Rebuild native production dependencies of the app for the target.
    ///
    /// Returns the rebuilt package locations; empty when none of the
    /// production dependencies is a native module. Packages are rebuilt
    /// one at a time, since they share the same node-gyp home, and the
    /// first failure stops the rebuild.
    pub fn rebuild(&self, opts: &InstallOptions) -> Result<Vec<PathBuf>> {
        let mut deps = BTreeSet::new();
        dependencies(self.reader, &opts.app_dir, false, &mut deps)?;

        let native = filter_native(&deps, self.probe)?;
        if native.is_empty() {
            tracing::debug!(
                "No native production dependencies among {} packages",
                deps.len()
            );
            return Ok(native);
        }

        tracing::info!(
            "Rebuilding native production dependencies for arch {}",
            opts.arch
        );

        let env = BuildEnvironment::for_rebuild(&self.ambient, &self.gyp_home);
        let context = ToolContext::detect(&self.ambient);
        let template = rebuild_invocation(
            &context,
            self.platform,
            env,
            &opts.electron_version,
            &opts.arch,
            &opts.extra_args,
        );

        let pb = self.progress_bar(native.len());
        for location in &native {
            if let Some(ref pb) = pb {
                pb.set_message(package_label(&opts.app_dir, location));
            }
            self.run(&template.plan_for(location))?;
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        Ok(native)
    }

    fn run(&self, plan: &InvocationPlan) -> Result<()> {
        let command = plan.display_command();
        tracing::debug!("Running `{}` in {}", command, plan.cwd.display());

        self.spawner
            .spawn(plan)
            .map_err(|source| StepError::Invocation {
                command,
                cwd: plan.cwd.clone(),
                source,
            })?;
        Ok(())
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.progress || total < 2 {
            return None;
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}

fn package_label(app_dir: &Path, location: &Path) -> String {
    crate::util::fs::relative_path(app_dir, location)
        .display()
        .to_string()
}

/// Install production dependencies with the real filesystem and processes.
pub fn install_dependencies(opts: &InstallOptions) -> Result<()> {
    let home = gyp_home()?;
    Rebuilder::new(
        installed_reader(),
        &FsProbe,
        &ProcessSpawner,
        Environment::capture(),
        home,
    )
    .install_dependencies(opts)
}

/// Rebuild native production dependencies with the real filesystem and processes.
pub fn rebuild(opts: &InstallOptions) -> Result<Vec<PathBuf>> {
    let home = gyp_home()?;
    Rebuilder::new(
        installed_reader(),
        &FsProbe,
        &ProcessSpawner,
        Environment::capture(),
        home,
    )
    .with_progress(true)
    .rebuild(opts)
}
