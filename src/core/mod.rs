//! Core data types: installed packages and their metadata.

pub mod manifest;
pub mod metadata;
pub mod reader;
pub mod tree;

pub use manifest::PackageJson;
pub use metadata::{compute_extra_args, BuildMetadata};
pub use reader::{installed_reader, InstalledReader, NodeModulesReader};
pub use tree::{DependencyRef, InstalledTree, NodeId, PackageNode};
