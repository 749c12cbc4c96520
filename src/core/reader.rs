//! Reading installed packages from `node_modules`.
//!
//! The reader builds an [`InstalledTree`] from what is on disk:
//!
//! - every package physically installed under a package's `node_modules`
//!   becomes a dependency of that package;
//! - every declared dependency is resolved the way Node resolves
//!   `require`, walking up the `node_modules` ancestry;
//! - packages not reachable from the app through declared production
//!   dependencies are marked extraneous.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};

use crate::core::manifest::PackageJson;
use crate::core::tree::{InstalledTree, NodeId, PackageNode};

/// Directory holding installed packages.
pub const NODE_MODULES: &str = "node_modules";

/// Source of installed package metadata.
pub trait InstalledReader: Sync {
    /// Read the installed tree of the package in `dir`.
    fn read(&self, dir: &Path) -> Result<InstalledTree>;
}

static SHARED_READER: LazyLock<NodeModulesReader> = LazyLock::new(NodeModulesReader::new);

/// Process-wide reader for production dependency trees.
pub fn installed_reader() -> &'static NodeModulesReader {
    &SHARED_READER
}

/// Reads installed packages from `node_modules` directories.
#[derive(Debug, Clone, Default)]
pub struct NodeModulesReader {
    include_dev: bool,
}

impl NodeModulesReader {
    /// Create a reader that treats dev dependencies as extraneous.
    pub fn new() -> Self {
        NodeModulesReader { include_dev: false }
    }

    /// Count the root package's dev dependencies as required.
    pub fn include_dev(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }
}

impl InstalledReader for NodeModulesReader {
    fn read(&self, dir: &Path) -> Result<InstalledTree> {
        let manifest = PackageJson::load(dir)?;
        let root = PackageNode::new(
            manifest.name.clone().unwrap_or_default(),
            dir.to_path_buf(),
        );
        let root = match &manifest.version {
            Some(version) => root.with_version(version.clone()),
            None => root,
        };

        let mut scan = Scan::new(InstalledTree::new(root));
        let root_id = scan.tree.root();
        scan.manifests.insert(root_id, manifest);
        let real_root = fs::canonicalize(dir)
            .with_context(|| format!("failed to resolve {}", dir.display()))?;
        scan.load_children(root_id, dir, &mut vec![real_root])?;

        let declared = scan.resolve_declared(self.include_dev);
        let mut tree = scan.tree;
        mark_extraneous(&mut tree, &declared);

        tracing::debug!("Read {} installed packages in {}", tree.node_count() - 1, dir.display());
        Ok(tree)
    }
}

/// Working state while reading one tree.
struct Scan {
    tree: InstalledTree,
    manifests: HashMap<NodeId, PackageJson>,
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, BTreeMap<String, NodeId>>,
}

impl Scan {
    fn new(tree: InstalledTree) -> Self {
        Scan {
            tree,
            manifests: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Load packages installed under `dir/node_modules`, recursively.
    ///
    /// `ancestry` holds the canonical paths of the packages being loaded so
    /// a symlink pointing back up the tree is not followed forever.
    fn load_children(&mut self, parent: NodeId, dir: &Path, ancestry: &mut Vec<PathBuf>) -> Result<()> {
        for (name, path) in installed_packages(&dir.join(NODE_MODULES))? {
            let real = match fs::canonicalize(&path) {
                Ok(real) => real,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if ancestry.contains(&real) {
                tracing::debug!("Skipping {}: links to an ancestor", path.display());
                continue;
            }

            let manifest = match PackageJson::load(&path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!("Skipping {}: {:#}", path.display(), e);
                    continue;
                }
            };

            let mut node = PackageNode::new(name.clone(), path.clone()).extraneous(true);
            if let Some(version) = &manifest.version {
                node = node.with_version(version.clone());
            }
            let id = self.tree.add_node(node);
            self.tree.add_dependency(parent, name.clone(), id);
            self.manifests.insert(id, manifest);
            self.parents.insert(id, parent);
            self.children.entry(parent).or_default().insert(name, id);

            ancestry.push(real);
            self.load_children(id, &path, ancestry)?;
            ancestry.pop();
        }
        Ok(())
    }

    /// Resolve `name` as seen from `from`.
    fn resolve(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(&found) = self.children.get(&id).and_then(|c| c.get(name)) {
                return Some(found);
            }
            current = self.parents.get(&id).copied();
        }
        None
    }

    /// Connect declared dependencies, returning the declared edges.
    fn resolve_declared(&mut self, include_dev: bool) -> HashMap<NodeId, Vec<NodeId>> {
        let root = self.tree.root();
        let mut declared: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let ids: Vec<NodeId> = self.tree.node_ids().collect();

        for id in ids {
            let Some(manifest) = self.manifests.get(&id) else {
                continue;
            };

            let mut wanted: Vec<(String, String, bool)> = manifest
                .production_dependencies()
                .map(|(name, range)| (name.clone(), range.clone(), manifest.is_optional(name)))
                .collect();
            if include_dev && id == root {
                wanted.extend(
                    manifest
                        .dev_dependencies
                        .iter()
                        .map(|(name, range)| (name.clone(), range.clone(), false)),
                );
            }

            for (name, range, optional) in wanted {
                match self.resolve(id, &name) {
                    Some(target) => {
                        self.tree.add_dependency(id, name, target);
                        declared.entry(id).or_default().push(target);
                    }
                    None if optional => {}
                    None => {
                        tracing::debug!("Missing dependency {}@{}", name, range);
                        self.tree.add_missing(id, name, range);
                    }
                }
            }
        }

        declared
    }
}

/// Packages found directly in a `node_modules` directory, by name.
fn installed_packages(node_modules: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut packages = Vec::new();
    if !node_modules.is_dir() {
        return Ok(packages);
    }

    for entry in read_dir_sorted(node_modules)? {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        if file_name.starts_with('@') && entry.path().is_dir() {
            for scoped in read_dir_sorted(&entry.path())? {
                let scoped_name = scoped.file_name().to_string_lossy().into_owned();
                if scoped_name.starts_with('.') || !scoped.path().is_dir() {
                    continue;
                }
                packages.push((format!("{}/{}", file_name, scoped_name), scoped.path()));
            }
        } else if entry.path().is_dir() {
            packages.push((file_name, entry.path()));
        }
    }

    Ok(packages)
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Unmark everything reachable from the root through declared edges.
fn mark_extraneous(tree: &mut InstalledTree, declared: &HashMap<NodeId, Vec<NodeId>>) {
    let root = tree.root();
    tree.set_extraneous(root, false);

    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        for &dep in declared.get(&id).into_iter().flatten() {
            if seen.insert(dep) {
                tree.set_extraneous(dep, false);
                queue.push_back(dep);
            }
        }
    }
}
