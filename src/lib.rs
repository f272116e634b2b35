//! Minimal incremental build orchestrator: targets declared by direct calls,
//! change detection through on-disk sidecar records, bounded-parallel
//! compile/link subprocesses, and a self-rebuilding build script.

mod bootstrap;
mod cache;
mod console;
mod errors;
mod jobs;
mod paths;
mod plan;
mod process;
mod scheduler;
mod session;
mod target;

pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::process::{NativeLauncher, ProcessHandle, ProcessLauncher};
pub use crate::session::{BuildSession, Toolchain};
pub use crate::target::{Target, TargetKind};
