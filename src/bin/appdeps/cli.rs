//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// appdeps - install and rebuild app dependencies for Electron
#[derive(Parser)]
#[command(name = "appdeps")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install production dependencies for the target runtime
    Install(TargetArgs),

    /// Rebuild native production dependencies for the target runtime
    Rebuild(TargetArgs),

    /// List installed dependencies
    Deps(DepsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct TargetArgs {
    /// App directory (defaults to current directory)
    #[arg(long)]
    pub app_dir: Option<PathBuf>,

    /// Electron version to build against (defaults to the installed electron)
    #[arg(long, env = "APPDEPS_ELECTRON_VERSION")]
    pub electron_version: Option<String>,

    /// Target architecture (defaults to the host architecture)
    #[arg(long)]
    pub arch: Option<String>,

    /// Extra arguments passed to the package manager
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

#[derive(Args)]
pub struct DepsArgs {
    /// App directory (defaults to current directory)
    #[arg(long)]
    pub app_dir: Option<PathBuf>,

    /// List extraneous packages instead of production dependencies
    #[arg(long)]
    pub extraneous: bool,

    /// Only list packages that need native compilation
    #[arg(long)]
    pub native: bool,

    /// Count dev dependencies as required
    #[arg(long)]
    pub dev: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
