//! Installed package tree.
//!
//! The tree is a directed graph: the same installed package can be
//! required by several parents, and packages may require each other in a
//! cycle. Nodes are addressed by [`NodeId`], which is the identity used
//! when deduplicating traversals. Two nodes may carry the same path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

/// Identity of a node within an [`InstalledTree`].
pub type NodeId = NodeIndex;

/// An installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// Package name (`@scope/name` for scoped packages)
    pub name: String,

    /// Installed version, if the manifest declares one
    pub version: Option<String>,

    /// Directory the package is installed in
    pub path: PathBuf,

    /// True when nothing in the production dependency graph requires it
    pub extraneous: bool,
}

impl PackageNode {
    /// Create a node that is not (yet) marked extraneous.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PackageNode {
            name: name.into(),
            version: None,
            path: path.into(),
            extraneous: false,
        }
    }

    /// Set the installed version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the extraneous flag.
    pub fn extraneous(mut self, extraneous: bool) -> Self {
        self.extraneous = extraneous;
        self
    }
}

/// Target of a named dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRef<'a> {
    /// Resolved to an installed package.
    Installed(NodeId),
    /// Declared but not installed anywhere visible; carries the requested range.
    Missing(&'a str),
}

/// Installed packages of one application, rooted at the application itself.
#[derive(Debug, Clone)]
pub struct InstalledTree {
    graph: DiGraph<PackageNode, String>,
    missing: BTreeMap<NodeId, BTreeMap<String, String>>,
    root: NodeId,
}

impl InstalledTree {
    /// Create a tree containing only the root package.
    pub fn new(root: PackageNode) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(root);
        InstalledTree {
            graph,
            missing: BTreeMap::new(),
            root,
        }
    }

    /// The application package.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Add a node without connecting it.
    pub fn add_node(&mut self, node: PackageNode) -> NodeId {
        self.graph.add_node(node)
    }

    /// Record that `from` depends on `to` under `name`.
    ///
    /// Dependencies are keyed by name: a second edge with the same name from
    /// the same node is ignored.
    pub fn add_dependency(&mut self, from: NodeId, name: impl Into<String>, to: NodeId) {
        let name = name.into();
        if self.dependency(from, &name).is_some() {
            return;
        }
        if let Some(missing) = self.missing.get_mut(&from) {
            missing.remove(&name);
        }
        self.graph.add_edge(from, to, name);
    }

    /// Record a declared dependency that could not be resolved.
    pub fn add_missing(&mut self, from: NodeId, name: impl Into<String>, range: impl Into<String>) {
        let name = name.into();
        if self.dependency(from, &name).is_some() {
            return;
        }
        self.missing
            .entry(from)
            .or_default()
            .insert(name, range.into());
    }

    /// Look up a resolved dependency of `from` by name.
    pub fn dependency(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.graph
            .edges(from)
            .find(|edge| edge.weight() == name)
            .map(|edge| edge.target())
    }

    /// All named dependencies of a node, resolved and missing.
    pub fn dependencies(&self, id: NodeId) -> impl Iterator<Item = (&str, DependencyRef<'_>)> {
        let installed = self
            .graph
            .edges(id)
            .map(|edge| (edge.weight().as_str(), DependencyRef::Installed(edge.target())));
        let missing = self
            .missing
            .get(&id)
            .into_iter()
            .flat_map(|missing| missing.iter())
            .map(|(name, range)| (name.as_str(), DependencyRef::Missing(range.as_str())));
        installed.chain(missing)
    }

    /// Get a node.
    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.graph[id]
    }

    /// Set the extraneous flag of a node.
    pub fn set_extraneous(&mut self, id: NodeId, extraneous: bool) {
        self.graph[id].extraneous = extraneous;
    }

    /// Find the first node installed at `path`.
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        self.graph
            .node_indices()
            .find(|&id| self.graph[id].path == path)
    }

    /// Iterate over all node ids, root first.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}
