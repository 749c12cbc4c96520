//! High-level operations.
//!
//! Collecting production dependencies, detecting native modules, and
//! planning and running package manager invocations.

pub mod environment;
pub mod error;
pub mod flatten;
pub mod invocation;
pub mod native;
pub mod rebuild;

pub use environment::{gyp_home, host_arch, BuildEnvironment};
pub use error::StepError;
pub use flatten::{dependencies, flatten};
pub use invocation::{
    install_invocation, rebuild_invocation, InvocationPlan, InvocationTemplate, PackageTool,
    Platform, Spawner, ToolContext,
};
pub use native::{filter_native, FsProbe, Probe, BUILD_DESCRIPTOR, PROBE_CONCURRENCY};
pub use rebuild::{install_dependencies, rebuild, InstallOptions, Rebuilder};
