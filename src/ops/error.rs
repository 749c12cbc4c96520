//! Errors raised by install and rebuild steps.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A failed step of an install or rebuild.
///
/// Nothing is retried: the first failing step ends the whole operation.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to read installed packages in {}", dir.display())]
    ReadInstalled {
        dir: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to check for {}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed in {}", cwd.display())]
    Invocation {
        command: String,
        cwd: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
