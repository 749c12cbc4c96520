//! `appdeps install` command

use anyhow::Result;

use crate::cli::TargetArgs;
use crate::commands::install_options;
use appdeps::ops::install_dependencies;

pub fn execute(args: TargetArgs) -> Result<()> {
    let opts = install_options(args)?;

    install_dependencies(&opts)?;

    eprintln!(
        "   Installed dependencies for electron {} ({})",
        opts.electron_version, opts.arch
    );
    Ok(())
}
