//! Run an external program for a provisioning step: relay its output, raise
//! its scheduling priority once it has settled, and hand back its exit code.

use std::path::Path;

pub mod command_builder;
pub mod config;
pub mod errors;
pub mod priority;
pub mod runner;

pub use config::RunnerConfig;
pub use errors::{LaunchError, PriorityError};
pub use priority::Priority;
pub use runner::{LaunchRequest, ProcessRunner};

/// Run `executable` with the default configuration, relaying its output to
/// this process's stdout and stderr, and return its exit code.
///
/// `args` is the whole argument string; pass `""` for none.
pub fn run_process(
    executable: impl AsRef<Path>,
    args: &str,
    priority: Priority,
) -> Result<i32, LaunchError> {
    let request = LaunchRequest::new(executable).args(args).priority(priority);
    ProcessRunner::default().run_blocking(&request)
}
