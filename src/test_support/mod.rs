//! Test utilities and mocks for appdeps unit tests.
//!
//! Provides recording and counting stand-ins for the collaborators the
//! rebuild steps talk to: process spawning and filesystem checks.

pub mod fixtures;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::ops::invocation::{InvocationPlan, Spawner};
use crate::ops::native::Probe;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Spawner that records plans instead of running them.
#[derive(Debug, Default)]
pub struct RecordingSpawner {
    calls: Mutex<Vec<InvocationPlan>>,
    fail_in: Option<PathBuf>,
}

impl RecordingSpawner {
    /// Create a spawner where every command succeeds.
    pub fn new() -> Self {
        RecordingSpawner::default()
    }

    /// Fail commands run in `dir`.
    pub fn fail_in(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fail_in = Some(dir.into());
        self
    }

    /// Plans received so far, in order.
    pub fn calls(&self) -> Vec<InvocationPlan> {
        self.calls.lock().unwrap().clone()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, plan: &InvocationPlan) -> Result<()> {
        self.calls.lock().unwrap().push(plan.clone());
        if self.fail_in.as_deref() == Some(plan.cwd.as_path()) {
            bail!("`{}` failed with exit code Some(1)", plan.display_command());
        }
        Ok(())
    }
}

/// Probe that tracks how many checks run at the same time.
pub struct CountingProbe {
    present: Box<dyn Fn(&Path) -> bool + Send + Sync>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingProbe {
    /// Create a probe answering with `present`.
    pub fn new(present: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        CountingProbe {
            present: Box::new(present),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Highest number of concurrent checks observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of checks.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for CountingProbe {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        thread::sleep(Duration::from_millis(5));
        let found = (self.present)(path);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(found)
    }
}

/// Probe whose checks always fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingProbe;

impl Probe for FailingProbe {
    fn exists(&self, _path: &Path) -> io::Result<bool> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
    }
}
