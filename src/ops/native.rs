//! Detecting packages that need native compilation.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::ops::error::StepError;

/// File marking a package as a node-gyp native module.
pub const BUILD_DESCRIPTOR: &str = "binding.gyp";

/// Maximum number of descriptor checks in flight at once.
pub const PROBE_CONCURRENCY: usize = 8;

/// Filesystem existence check.
pub trait Probe: Sync {
    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// Probe backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl Probe for FsProbe {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }
}

/// Keep the locations that contain a [`BUILD_DESCRIPTOR`].
///
/// Checks run on a dedicated pool of [`PROBE_CONCURRENCY`] threads. A
/// failed check fails the whole call. The result is sorted by path, but
/// callers should not rely on any order.
pub fn filter_native(locations: &BTreeSet<PathBuf>, probe: &dyn Probe) -> Result<Vec<PathBuf>> {
    if locations.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(PROBE_CONCURRENCY)
        .thread_name(|i| format!("appdeps-probe-{}", i))
        .build()
        .context("failed to start probe threads")?;

    let probed = pool.install(|| {
        locations
            .par_iter()
            .map(|location| {
                let descriptor = location.join(BUILD_DESCRIPTOR);
                match probe.exists(&descriptor) {
                    Ok(true) => Ok(Some(location.clone())),
                    Ok(false) => Ok(None),
                    Err(source) => Err(StepError::Probe {
                        path: descriptor,
                        source,
                    }),
                }
            })
            .collect::<Result<Vec<_>, StepError>>()
    })?;

    let mut native: Vec<PathBuf> = probed.into_iter().flatten().collect();
    native.sort();
    Ok(native)
}
