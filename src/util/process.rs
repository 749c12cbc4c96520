//! Subprocess execution utilities.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{bail, Context, Result};

use crate::ops::invocation::{InvocationPlan, Spawner};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(OsString, OsString)>,
    env_clear: bool,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            env_clear: false,
            cwd: None,
        }
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Start from an empty environment instead of inheriting ours.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if self.env_clear {
            cmd.env_clear();
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute with inherited stdio and return the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
        Ok(status)
    }

    /// Execute with inherited stdio and require success.
    pub fn exec_and_check(&self) -> Result<()> {
        let status = self.status()?;
        if !status.success() {
            bail!(
                "`{}` failed with exit code {:?}",
                self.display_command(),
                status.code()
            );
        }
        Ok(())
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Runs invocation plans as child processes sharing our stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSpawner;

impl ProcessSpawner {
    fn builder(plan: &InvocationPlan) -> ProcessBuilder {
        // Bare names are looked up on the child's PATH, which on Windows is
        // also what resolves `npm.cmd`.
        let program = if Path::new(&plan.executable).components().count() == 1 {
            let found = plan.env.get_os("PATH").and_then(|path| {
                which::which_in(&plan.executable, Some(path), &plan.cwd).ok()
            });
            found
                .or_else(|| find_executable(&plan.executable))
                .unwrap_or_else(|| PathBuf::from(&plan.executable))
        } else {
            PathBuf::from(&plan.executable)
        };

        plan.env.iter().fold(
            ProcessBuilder::new(program)
                .args(&plan.args)
                .cwd(&plan.cwd)
                .env_clear(),
            |builder, (key, value)| builder.env(key, value),
        )
    }
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, plan: &InvocationPlan) -> Result<()> {
        Self::builder(plan).exec_and_check()
    }
}
