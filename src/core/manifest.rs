//! `package.json` parsing.
//!
//! Only the fields needed to rebuild the installed tree are read; every
//! other key is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::metadata::BuildMetadata;
use crate::util::fs::read_to_string;

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// A parsed `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub version: Option<String>,

    #[serde(deserialize_with = "lenient_dependencies")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(deserialize_with = "lenient_dependencies")]
    pub optional_dependencies: BTreeMap<String, String>,

    #[serde(deserialize_with = "lenient_dependencies")]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Raw `build` section; decoded on demand by [`PackageJson::build_metadata`]
    build: Option<Value>,
}

/// Installed packages in the wild carry malformed fields; anything that is
/// not a string reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Dependency maps: `null` and other non-objects read as empty, entries
/// with a non-string range are skipped, and a list of names means any
/// version of each.
fn lenient_dependencies<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(name, range)| match range {
                Value::String(range) => Some((name, range)),
                _ => None,
            })
            .collect(),
        Value::Array(names) => names
            .into_iter()
            .filter_map(|name| match name {
                Value::String(name) => Some((name, "*".to_string())),
                _ => None,
            })
            .collect(),
        _ => BTreeMap::new(),
    })
}

impl PackageJson {
    /// Load the manifest in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let contents = read_to_string(&path)?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse manifest contents.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Declared production dependencies, optional ones included.
    pub fn production_dependencies(&self) -> impl Iterator<Item = (&String, &String)> {
        self.dependencies
            .iter()
            .chain(self.optional_dependencies.iter())
    }

    /// Whether `name` is an optional dependency.
    pub fn is_optional(&self, name: &str) -> bool {
        self.optional_dependencies.contains_key(name)
    }

    /// Look up a requested range in `dependencies` or `devDependencies`.
    pub fn requested_range(&self, name: &str) -> Option<&str> {
        self.dev_dependencies
            .get(name)
            .or_else(|| self.dependencies.get(name))
            .map(String::as_str)
    }

    /// Decode the `build` section.
    pub fn build_metadata(&self) -> Result<BuildMetadata> {
        match &self.build {
            Some(value) => serde_json::from_value(value.clone())
                .context("invalid `build` section in package.json"),
            None => Ok(BuildMetadata::default()),
        }
    }
}
