//! `appdeps rebuild` command

use anyhow::Result;

use crate::cli::TargetArgs;
use crate::commands::install_options;
use appdeps::ops::rebuild;
use appdeps::util::fs::relative_path;

pub fn execute(args: TargetArgs) -> Result<()> {
    let opts = install_options(args)?;

    let rebuilt = rebuild(&opts)?;

    if rebuilt.is_empty() {
        eprintln!("   No native production dependencies to rebuild");
    } else {
        for location in &rebuilt {
            eprintln!("   Rebuilt {}", relative_path(&opts.app_dir, location).display());
        }
        eprintln!(
            "  Finished {} package(s) for electron {} ({})",
            rebuilt.len(),
            opts.electron_version,
            opts.arch
        );
    }
    Ok(())
}
