//! appdeps - install and rebuild app dependencies for an Electron target
//!
//! This crate reads the packages installed in an app's `node_modules`,
//! finds the production dependencies that are native modules, and drives
//! npm or yarn to build them against a target Electron version and
//! architecture.

pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for appdeps unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    metadata::{compute_extra_args, BuildMetadata},
    reader::{installed_reader, InstalledReader, NodeModulesReader},
    tree::{InstalledTree, NodeId, PackageNode},
};

pub use crate::ops::{dependencies, install_dependencies, rebuild, InstallOptions, Rebuilder};
