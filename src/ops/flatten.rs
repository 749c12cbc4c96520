//! Flattening the installed tree into a set of package locations.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::reader::InstalledReader;
use crate::core::tree::{DependencyRef, InstalledTree, NodeId};
use crate::ops::error::StepError;

/// Collect the locations of the packages in `dir` selected by `extraneous_only`.
///
/// With `extraneous_only == false` the production dependencies are added
/// to `result`; with `true`, the extraneous ones.
pub fn dependencies(
    reader: &dyn InstalledReader,
    dir: &Path,
    extraneous_only: bool,
    result: &mut BTreeSet<PathBuf>,
) -> Result<()> {
    let tree = reader.read(dir).map_err(|source| StepError::ReadInstalled {
        dir: dir.to_path_buf(),
        source,
    })?;
    flatten_into(&tree, extraneous_only, result);
    Ok(())
}

/// Flatten a tree into the locations of packages whose extraneous flag
/// equals `extraneous_only`.
///
/// A matching package is reported and its own dependencies are not
/// examined. A non-matching package is descended into, except that an
/// extraneous package is never entered when collecting production
/// dependencies.
pub fn flatten(tree: &InstalledTree, extraneous_only: bool) -> BTreeSet<PathBuf> {
    let mut result = BTreeSet::new();
    flatten_into(tree, extraneous_only, &mut result);
    result
}

fn flatten_into(tree: &InstalledTree, extraneous_only: bool, result: &mut BTreeSet<PathBuf>) {
    let mut visited = HashSet::new();
    walk(tree, tree.root(), extraneous_only, result, &mut visited);
}

fn walk(
    tree: &InstalledTree,
    id: NodeId,
    extraneous_only: bool,
    result: &mut BTreeSet<PathBuf>,
    visited: &mut HashSet<NodeId>,
) {
    for (_, dep) in tree.dependencies(id) {
        let DependencyRef::Installed(child) = dep else {
            continue;
        };
        let node = tree.node(child);
        if !extraneous_only && node.extraneous {
            continue;
        }
        // Marked before descending too, so cycles of non-matching nodes end.
        if !visited.insert(child) {
            continue;
        }

        if node.extraneous == extraneous_only {
            result.insert(node.path.clone());
        } else {
            walk(tree, child, extraneous_only, result, visited);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::NodeModulesReader;
    use crate::core::tree::PackageNode;
    use crate::test_support::AppFixture;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(format!("/app/node_modules/{}", name))
    }

    fn add(tree: &mut InstalledTree, parent: NodeId, name: &str, extraneous: bool) -> NodeId {
        let id = tree.add_node(PackageNode::new(name, path(name)).extraneous(extraneous));
        tree.add_dependency(parent, name, id);
        id
    }

    fn app() -> InstalledTree {
        InstalledTree::new(PackageNode::new("app", "/app"))
    }

    #[test]
    fn test_production_scenario() {
        let mut tree = app();
        let root = tree.root();
        add(&mut tree, root, "a", false);
        add(&mut tree, root, "b", true);

        assert_eq!(flatten(&tree, false), BTreeSet::from([path("a")]));
        assert_eq!(flatten(&tree, true), BTreeSet::from([path("b")]));
    }

    #[test]
    fn test_matching_node_is_terminal() {
        let mut tree = app();
        let root = tree.root();
        let a = add(&mut tree, root, "a", false);
        add(&mut tree, a, "inner", false);

        assert_eq!(flatten(&tree, false), BTreeSet::from([path("a")]));
    }

    #[test]
    fn test_extraneous_search_descends_into_production() {
        let mut tree = app();
        let root = tree.root();
        let a = add(&mut tree, root, "a", false);
        let deep = add(&mut tree, a, "deep", true);
        add(&mut tree, deep, "deeper", true);

        assert_eq!(flatten(&tree, true), BTreeSet::from([path("deep")]));
    }

    #[test]
    fn test_production_search_skips_extraneous_subtree() {
        let mut tree = app();
        let root = tree.root();
        let stray = add(&mut tree, root, "stray", true);
        add(&mut tree, stray, "hidden", false);

        assert!(flatten(&tree, false).is_empty());
    }

    #[test]
    fn test_shared_node_reported_once() {
        let mut tree = app();
        let root = tree.root();
        let a = add(&mut tree, root, "a", false);
        let c = add(&mut tree, root, "c", false);
        let shared = add(&mut tree, a, "shared", true);
        tree.add_dependency(c, "shared", shared);

        let found = flatten(&tree, true);
        assert_eq!(found, BTreeSet::from([path("shared")]));
    }

    #[test]
    fn test_distinct_nodes_sharing_a_path() {
        let mut tree = app();
        let root = tree.root();
        add(&mut tree, root, "a", false);
        let twin = tree.add_node(PackageNode::new("a-twin", path("a")));
        tree.add_dependency(root, "a-twin", twin);

        assert_eq!(flatten(&tree, false), BTreeSet::from([path("a")]));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut tree = app();
        let root = tree.root();
        let a = add(&mut tree, root, "a", false);
        let b = add(&mut tree, a, "b", false);
        tree.add_dependency(b, "a", a);
        add(&mut tree, b, "leaf", true);

        assert_eq!(flatten(&tree, true), BTreeSet::from([path("leaf")]));
    }

    #[test]
    fn test_missing_dependencies_are_skipped() {
        let mut tree = app();
        let root = tree.root();
        tree.add_missing(root, "ghost", "^1.0.0");
        add(&mut tree, root, "a", false);

        assert_eq!(flatten(&tree, false), BTreeSet::from([path("a")]));
    }

    #[test]
    fn test_selectors_are_disjoint() {
        let mut tree = app();
        let root = tree.root();
        let a = add(&mut tree, root, "a", false);
        let b = add(&mut tree, a, "b", true);
        add(&mut tree, b, "c", false);
        let d = add(&mut tree, root, "d", true);
        tree.add_dependency(a, "d", d);
        add(&mut tree, root, "e", false);

        let production = flatten(&tree, false);
        let extraneous = flatten(&tree, true);
        assert!(production.is_disjoint(&extraneous));
        assert_eq!(production, BTreeSet::from([path("a"), path("e")]));
        assert_eq!(extraneous, BTreeSet::from([path("b"), path("d")]));
    }

    #[test]
    fn test_dependencies_reads_from_disk() {
        let app = AppFixture::new()
            .dependencies(&[("a", "*")])
            .package("a", &[])
            .package("b", &[]);

        let mut out = BTreeSet::new();
        dependencies(&NodeModulesReader::new(), app.path(), false, &mut out).unwrap();
        assert_eq!(out, BTreeSet::from([app.module("a")]));

        let mut extraneous = BTreeSet::new();
        dependencies(&NodeModulesReader::new(), app.path(), true, &mut extraneous).unwrap();
        assert_eq!(extraneous, BTreeSet::from([app.module("b")]));
    }

    #[test]
    fn test_dependencies_read_failure_propagates() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut out = BTreeSet::new();

        let err = dependencies(&NodeModulesReader::new(), tmp.path(), false, &mut out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StepError>(),
            Some(StepError::ReadInstalled { .. })
        ));
        assert!(out.is_empty());
    }
}
