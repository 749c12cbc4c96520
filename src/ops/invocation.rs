//! Planning package manager invocations.
//!
//! Which executable runs depends on how we were started. When launched
//! from an npm or yarn script, the package manager that launched us is
//! reused by running its entry script with the same Node binary.
//! Otherwise a standalone `npm` (or `yarn`, when forced) is run.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::metadata::BUILD_FROM_SOURCE;
use crate::ops::environment::{BuildEnvironment, ELECTRON_DIST_URL, ELECTRON_RUNTIME};
use crate::util::env::Environment;

/// Hints set by npm and yarn when running a package script.
const EXEC_PATH_HINTS: &[&str] = &["npm_execpath", "NPM_CLI_JS"];

/// Hints naming the Node binary that runs the package manager.
const NODE_HINTS: &[&str] = &["npm_node_execpath", "NODE_EXE"];

const DEFAULT_NODE: &str = "node";
const NO_BIN_LINKS_VAR: &str = "NPM_NO_BIN_LINKS";
const FORCE_YARN_VAR: &str = "FORCE_YARN";

/// Keeps npm from revalidating its local cache during installs.
const CACHE_MIN: &str = "999999999";

/// Platform family, for executable naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// The platform we are running on.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Name of the launcher for `tool` on this platform.
    pub fn executable(self, tool: &str) -> String {
        match self {
            Platform::Windows => format!("{}.cmd", tool),
            Platform::Unix => tool.to_string(),
        }
    }
}

/// A standalone package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTool {
    Npm,
    Yarn,
}

impl PackageTool {
    /// Pick the standalone tool: npm unless `FORCE_YARN=true`.
    pub fn select(ambient: &Environment) -> Self {
        if ambient.is_true(FORCE_YARN_VAR) {
            PackageTool::Yarn
        } else {
            PackageTool::Npm
        }
    }

    /// Base command name.
    pub fn name(self) -> &'static str {
        match self {
            PackageTool::Npm => "npm",
            PackageTool::Yarn => "yarn",
        }
    }
}

impl fmt::Display for PackageTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the package manager is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolContext {
    /// Run a package manager found on `PATH`.
    Standalone(PackageTool),

    /// We were started by a package manager; run its entry script again.
    InheritedSession {
        /// Package manager entry point (`npm-cli.js`, `yarn.js`, ...)
        script: String,
        /// Node binary used to run the script
        node: String,
    },
}

impl ToolContext {
    /// Decide from the ambient environment.
    ///
    /// Any non-empty exec path hint means a package manager session is
    /// active, whichever package manager it belongs to.
    pub fn detect(ambient: &Environment) -> Self {
        let script = EXEC_PATH_HINTS
            .iter()
            .find_map(|key| ambient.get_non_empty(key));

        match script {
            Some(script) => {
                let node = NODE_HINTS
                    .iter()
                    .find_map(|key| ambient.get_non_empty(key))
                    .unwrap_or(DEFAULT_NODE);
                ToolContext::InheritedSession {
                    script: script.to_string(),
                    node: node.to_string(),
                }
            }
            None => ToolContext::Standalone(PackageTool::select(ambient)),
        }
    }

    /// Whether a package manager session is being reused.
    pub fn is_session(&self) -> bool {
        matches!(self, ToolContext::InheritedSession { .. })
    }

    /// Executable plus the arguments that must precede the command.
    fn launcher(&self, platform: Platform) -> (String, Vec<String>) {
        match self {
            ToolContext::Standalone(tool) => (platform.executable(tool.name()), Vec::new()),
            ToolContext::InheritedSession { script, node } => (node.clone(), vec![script.clone()]),
        }
    }
}

/// An executable with arguments and environment but no working directory.
///
/// Built once and turned into one [`InvocationPlan`] per directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationTemplate {
    pub executable: String,
    pub args: Vec<String>,
    pub env: BuildEnvironment,
}

impl InvocationTemplate {
    /// Plan a run of this command in `cwd`.
    pub fn plan_for(&self, cwd: &Path) -> InvocationPlan {
        InvocationPlan {
            executable: self.executable.clone(),
            args: self.args.clone(),
            cwd: cwd.to_path_buf(),
            env: self.env.clone(),
        }
    }

    /// The command line, for logs.
    pub fn display_command(&self) -> String {
        display_command(&self.executable, &self.args)
    }
}

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    pub executable: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BuildEnvironment,
}

impl InvocationPlan {
    /// The command line, for logs and errors.
    pub fn display_command(&self) -> String {
        display_command(&self.executable, &self.args)
    }
}

fn display_command(executable: &str, args: &[String]) -> String {
    let mut parts = vec![executable.to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

/// Runs planned commands.
pub trait Spawner {
    /// Run the command to completion; a non-zero exit is an error.
    fn spawn(&self, plan: &InvocationPlan) -> Result<()>;
}

/// Plan `install --production` for an app.
///
/// `--no-bin-links` (when `NPM_NO_BIN_LINKS=true`) and `--cache-min` are
/// only passed to a standalone tool. A reused session rejects
/// `--build-from-source`, so it is dropped from `extra_args` there.
pub fn install_invocation(
    context: &ToolContext,
    platform: Platform,
    ambient: &Environment,
    env: BuildEnvironment,
    extra_args: &[String],
) -> InvocationTemplate {
    let (executable, mut args) = context.launcher(platform);
    args.extend(["install", "--production"].map(String::from));

    let session = context.is_session();
    if !session {
        if ambient.is_true(NO_BIN_LINKS_VAR) {
            args.push("--no-bin-links".to_string());
        }
        args.extend(["--cache-min", CACHE_MIN].map(String::from));
    }

    args.extend(
        extra_args
            .iter()
            .filter(|arg| !(session && arg.as_str() == BUILD_FROM_SOURCE))
            .cloned(),
    );

    InvocationTemplate {
        executable,
        args,
        env,
    }
}

/// Plan `run install` for rebuilding native packages.
///
/// The target runtime is passed as flags after `--`; `extra_args` are
/// forwarded unchanged.
pub fn rebuild_invocation(
    context: &ToolContext,
    platform: Platform,
    env: BuildEnvironment,
    runtime_version: &str,
    arch: &str,
    extra_args: &[String],
) -> InvocationTemplate {
    let (executable, mut args) = context.launcher(platform);
    args.extend(["run", "install", "--"].map(String::from));
    args.push(format!("--disturl={}", ELECTRON_DIST_URL));
    args.push(format!("--target={}", runtime_version));
    args.push(format!("--runtime={}", ELECTRON_RUNTIME));
    args.push(format!("--arch={}", arch));
    args.extend(extra_args.iter().cloned());

    InvocationTemplate {
        executable,
        args,
        env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> BuildEnvironment {
        BuildEnvironment::for_rebuild(&Environment::new(), Path::new("/gyp"))
    }

    fn session() -> Environment {
        Environment::new()
            .with("npm_execpath", "/usr/lib/node_modules/npm/bin/npm-cli.js")
            .with("npm_node_execpath", "/usr/bin/nodejs")
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_standalone() {
        assert_eq!(
            ToolContext::detect(&Environment::new()),
            ToolContext::Standalone(PackageTool::Npm)
        );
        assert_eq!(
            ToolContext::detect(&Environment::new().with("FORCE_YARN", "true")),
            ToolContext::Standalone(PackageTool::Yarn)
        );
        assert_eq!(
            ToolContext::detect(&Environment::new().with("FORCE_YARN", "1")),
            ToolContext::Standalone(PackageTool::Npm)
        );
    }

    #[test]
    fn test_detect_session() {
        assert_eq!(
            ToolContext::detect(&session()),
            ToolContext::InheritedSession {
                script: "/usr/lib/node_modules/npm/bin/npm-cli.js".to_string(),
                node: "/usr/bin/nodejs".to_string(),
            }
        );
    }

    #[test]
    fn test_detect_any_hint_is_a_session() {
        // The hint does not need to mention a particular package manager.
        let ambient = Environment::new().with("NPM_CLI_JS", "/opt/npm/cli.js").with("NODE_EXE", "/opt/node");
        assert_eq!(
            ToolContext::detect(&ambient),
            ToolContext::InheritedSession {
                script: "/opt/npm/cli.js".to_string(),
                node: "/opt/node".to_string(),
            }
        );

        let yarn = Environment::new().with("npm_execpath", "/usr/lib/yarn/bin/yarn.js");
        assert_eq!(
            ToolContext::detect(&yarn),
            ToolContext::InheritedSession {
                script: "/usr/lib/yarn/bin/yarn.js".to_string(),
                node: "node".to_string(),
            }
        );
    }

    #[test]
    fn test_detect_empty_hint_is_ignored() {
        let ambient = Environment::new().with("npm_execpath", "").with("NPM_CLI_JS", "/opt/cli.js");
        assert!(matches!(
            ToolContext::detect(&ambient),
            ToolContext::InheritedSession { ref script, .. } if script == "/opt/cli.js"
        ));
        assert!(!ToolContext::detect(&Environment::new().with("npm_execpath", "")).is_session());
        assert_eq!(
            ToolContext::detect(&Environment::new().with("NPM_CLI_JS", "")),
            ToolContext::Standalone(PackageTool::Npm)
        );
    }

    #[test]
    fn test_platform_executable() {
        assert_eq!(Platform::Windows.executable("npm"), "npm.cmd");
        assert_eq!(Platform::Unix.executable("yarn"), "yarn");
    }

    #[test]
    fn test_install_standalone() {
        let ambient = Environment::new().with("NPM_NO_BIN_LINKS", "true");
        let context = ToolContext::detect(&ambient);
        let plan = install_invocation(
            &context,
            Platform::Unix,
            &ambient,
            env(),
            &strings(&["--build-from-source", "--foo"]),
        );

        assert_eq!(plan.executable, "npm");
        assert_eq!(
            plan.args,
            strings(&[
                "install",
                "--production",
                "--no-bin-links",
                "--cache-min",
                "999999999",
                "--build-from-source",
                "--foo",
            ])
        );
    }

    #[test]
    fn test_install_forced_yarn_on_windows() {
        let ambient = Environment::new().with("FORCE_YARN", "true");
        let context = ToolContext::detect(&ambient);
        let plan = install_invocation(&context, Platform::Windows, &ambient, env(), &[]);

        assert_eq!(plan.executable, "yarn.cmd");
        assert_eq!(plan.args, strings(&["install", "--production", "--cache-min", "999999999"]));
    }

    #[test]
    fn test_install_session_filters_build_from_source() {
        let ambient = session().with("NPM_NO_BIN_LINKS", "true");
        let context = ToolContext::detect(&ambient);
        let plan = install_invocation(
            &context,
            Platform::Windows,
            &ambient,
            env(),
            &strings(&["--build-from-source", "--foo"]),
        );

        assert_eq!(plan.executable, "/usr/bin/nodejs");
        assert_eq!(
            plan.args,
            strings(&[
                "/usr/lib/node_modules/npm/bin/npm-cli.js",
                "install",
                "--production",
                "--foo",
            ])
        );
    }

    #[test]
    fn test_rebuild_forwards_everything() {
        let context = ToolContext::detect(&session());
        let plan = rebuild_invocation(
            &context,
            Platform::Unix,
            env(),
            "1.4.3",
            "ia32",
            &strings(&["--build-from-source"]),
        );

        assert_eq!(plan.executable, "/usr/bin/nodejs");
        assert_eq!(
            plan.args,
            strings(&[
                "/usr/lib/node_modules/npm/bin/npm-cli.js",
                "run",
                "install",
                "--",
                "--disturl=https://atom.io/download/electron",
                "--target=1.4.3",
                "--runtime=electron",
                "--arch=ia32",
                "--build-from-source",
            ])
        );
    }

    #[test]
    fn test_rebuild_standalone() {
        let context = ToolContext::Standalone(PackageTool::Npm);
        let plan = rebuild_invocation(&context, Platform::Windows, env(), "1.4.3", "x64", &[]);

        assert_eq!(plan.executable, "npm.cmd");
        assert_eq!(&plan.args[..3], &strings(&["run", "install", "--"])[..]);
        assert_eq!(plan.args.len(), 7);
    }

    #[test]
    fn test_plan_for_directory() {
        let context = ToolContext::Standalone(PackageTool::Npm);
        let template = rebuild_invocation(&context, Platform::Unix, env(), "1.4.3", "x64", &[]);

        let a = template.plan_for(Path::new("/app/node_modules/a"));
        let b = template.plan_for(Path::new("/app/node_modules/b"));
        assert_eq!(a.cwd, PathBuf::from("/app/node_modules/a"));
        assert_eq!(b.cwd, PathBuf::from("/app/node_modules/b"));
        assert_eq!(a.args, b.args);
        assert_eq!(a.env.get("HOME"), Some("/gyp"));
        assert!(a.display_command().starts_with("npm run install --"));
        assert_eq!(template.display_command(), a.display_command());
    }
}
