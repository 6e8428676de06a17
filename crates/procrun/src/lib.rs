//! # procrun
//!
//! Thin, blocking wrapper around external programs.
//!
//! Every external tool the orchestrator touches (container builder, code
//! generator, service manager) goes through the [`CommandRunner`] trait. A
//! command either succeeds (exit status zero) or fails with
//! [`ExecutionFailed`]; a program that cannot be launched and a program that
//! exits non-zero are reported the same way.
//!
//! ## Example
//!
//! ```no_run
//! use procrun::{CommandRunner, Invocation, SystemRunner};
//!
//! let runner = SystemRunner;
//! runner.run(&Invocation::new("docker").args(["pull", "ubuntu:22.04"]))?;
//!
//! let units = runner.output(&Invocation::parse("systemctl list-units --no-legend"))?;
//! println!("{units}");
//! # Ok::<(), procrun::ExecutionFailed>(())
//! ```
//!
//! ## Runners
//!
//! - [`SystemRunner`]: spawns real processes
//! - [`DryRunRunner`]: prints commands instead of running them
//! - `testing::ScriptedRunner` (feature `testing`): records commands and
//!   replays scripted results

pub mod error;
pub mod invocation;
pub mod system;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Cause, ExecutionFailed, Result};
pub use invocation::Invocation;
pub use system::{DryRunRunner, SystemRunner};

/// Executes invocations on behalf of the orchestrator.
///
/// Implementations block until the command has exited; there is no timeout.
pub trait CommandRunner: Send + Sync {
    /// Run a command with stdio inherited from the current process.
    fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Run a command and capture its standard output.
    fn output(&self, invocation: &Invocation) -> Result<String>;

    /// Run `producer | consumer`.
    ///
    /// The pipeline's status is the consumer's status. A producer that
    /// cannot be launched fails the pipeline.
    fn pipe(&self, producer: &Invocation, consumer: &Invocation) -> Result<()>;
}

/// Render a pipeline the way a shell would print it.
pub fn pipeline_display(producer: &Invocation, consumer: &Invocation) -> String {
    format!("{producer} | {consumer}")
}
