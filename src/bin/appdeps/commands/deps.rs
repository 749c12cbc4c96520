//! `appdeps deps` command

use std::collections::BTreeSet;

use anyhow::Result;

use crate::cli::DepsArgs;
use crate::commands::app_dir;
use appdeps::core::NodeModulesReader;
use appdeps::ops::{dependencies, filter_native, FsProbe};
use appdeps::util::fs::relative_path;

pub fn execute(args: DepsArgs) -> Result<()> {
    let app_dir = app_dir(args.app_dir)?;
    let reader = NodeModulesReader::new().include_dev(args.dev);

    let mut locations = BTreeSet::new();
    dependencies(&reader, &app_dir, args.extraneous, &mut locations)?;

    let listed = if args.native {
        filter_native(&locations, &FsProbe)?
    } else {
        locations.into_iter().collect()
    };

    for location in &listed {
        println!("{}", relative_path(&app_dir, location).display());
    }
    Ok(())
}
