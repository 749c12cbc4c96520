//! On-disk app fixtures.
//!
//! Builds an app directory with a `package.json` and a `node_modules`
//! tree inside a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tempfile::TempDir;

use crate::core::manifest::MANIFEST_FILE;
use crate::core::reader::NODE_MODULES;
use crate::ops::native::BUILD_DESCRIPTOR;

/// An app directory under construction.
pub struct AppFixture {
    dir: TempDir,
}

impl AppFixture {
    /// Create an app named `app` with no dependencies.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "app", &[]);
        AppFixture { dir }
    }

    /// The app directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location of a top-level installed package.
    pub fn module(&self, name: &str) -> PathBuf {
        self.path().join(NODE_MODULES).join(name)
    }

    /// Declare production dependencies of the app.
    pub fn dependencies(self, deps: &[(&str, &str)]) -> Self {
        self.set_app_field("dependencies", deps)
    }

    /// Declare dev dependencies of the app.
    pub fn dev_dependencies(self, deps: &[(&str, &str)]) -> Self {
        self.set_app_field("devDependencies", deps)
    }

    /// Install a package at the top level of `node_modules`.
    pub fn package(self, name: &str, deps: &[(&str, &str)]) -> Self {
        write_manifest(&self.module(name), name, deps);
        self
    }

    /// Install a package inside another package's `node_modules`.
    pub fn nested_package(self, parent: &str, name: &str, deps: &[(&str, &str)]) -> Self {
        let dir = self.module(parent).join(NODE_MODULES).join(name);
        write_manifest(&dir, name, deps);
        self
    }

    /// Give a top-level package a build descriptor.
    pub fn native(self, name: &str) -> Self {
        fs::write(self.module(name).join(BUILD_DESCRIPTOR), "{ 'targets': [] }").unwrap();
        self
    }

    fn set_app_field(self, field: &str, deps: &[(&str, &str)]) -> Self {
        let path = self.path().join(MANIFEST_FILE);
        let mut manifest: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        manifest[field] = Value::Object(dependency_map(deps));
        fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
        self
    }
}

impl Default for AppFixture {
    fn default() -> Self {
        AppFixture::new()
    }
}

fn dependency_map(deps: &[(&str, &str)]) -> Map<String, Value> {
    deps.iter()
        .map(|(name, range)| (name.to_string(), Value::String(range.to_string())))
        .collect()
}

fn write_manifest(dir: &Path, name: &str, deps: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    let manifest = json!({
        "name": name,
        "version": "1.0.0",
        "dependencies": dependency_map(deps),
    });
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
}
