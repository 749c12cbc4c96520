//! Snapshot of a process environment.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// An owned set of environment variables.
///
/// Planning code reads hints from an `Environment` instead of the live
/// process environment, so the same decisions can be replayed in tests.
/// Names and values are kept as `OsString` so variables that are not valid
/// UTF-8 still reach child processes untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Environment::default()
    }

    /// Capture the current process environment.
    pub fn capture() -> Self {
        std::env::vars_os().collect()
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a variable as text. Values that are not valid UTF-8 read as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    /// Get a variable as stored.
    pub fn get_os(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Get a variable, treating an empty value as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Whether a variable is set to exactly `true`.
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    /// Iterate over all variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub(crate) fn insert(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl FromIterator<(OsString, OsString)> for Environment {
    fn from_iter<I: IntoIterator<Item = (OsString, OsString)>>(iter: I) -> Self {
        Environment {
            vars: iter.into_iter().collect(),
        }
    }
}
