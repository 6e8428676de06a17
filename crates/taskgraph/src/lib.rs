//! # taskgraph
//!
//! Named build/deploy tasks with prerequisites and deferred cleanup.
//!
//! ## Core Concepts
//!
//! - **Task**: a named body plus an ordered list of prerequisite task names
//! - **Registry**: every task known to a run
//! - **Runner**: executes a task, its prerequisites first, one at a time
//! - **Scope**: what a body sees while it runs; nested task calls and
//!   deferred cleanup registration go through it
//!
//! ## Example
//!
//! ```
//! use taskgraph::{Registry, Runner, Task};
//! use std::sync::Arc;
//!
//! let mut registry = Registry::new();
//! registry.register(Task::new("rewrite", |_| Ok(())))?;
//! registry.register(Task::new("revert", |_| Ok(())))?;
//! registry.register(
//!     Task::new("test", |scope| {
//!         scope.defer_task("revert");
//!         // ... run the tests; "revert" runs whatever happens here
//!         Ok(())
//!     })
//!     .depends_on(["rewrite"]),
//! )?;
//!
//! Runner::new(Arc::new(registry)).run("test")?;
//! # Ok::<(), taskgraph::Error>(())
//! ```
//!
//! ## Ordering guarantees
//!
//! - prerequisites run in declaration order before the body; the first
//!   failure stops everything after it
//! - deferred actions run after the body, most recently registered first,
//!   whether the body succeeded or not
//! - a task that re-enters itself through prerequisites or nested calls
//!   fails with [`Error::Cycle`]
//! - nothing is memoized: a prerequisite shared by two tasks runs twice

pub mod error;
pub mod observer;
pub mod registry;
pub mod runner;
pub mod task;

pub use error::{Error, Result};
pub use observer::{Observer, Silent};
pub use registry::Registry;
pub use runner::{Runner, Scope};
pub use task::Task;
