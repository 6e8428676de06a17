//! Progress callbacks
//!
//! Implement [`Observer`] to follow a run without the runner depending on
//! any particular terminal UI.

use crate::error::Result;

/// Receives notifications while tasks execute.
pub trait Observer {
    /// A task's prerequisites are done and its body is about to run
    fn on_task_start(&mut self, task: &str);

    /// A task's body and deferred actions have finished
    fn on_task_finish(&mut self, task: &str, outcome: &Result<()>);

    /// A deferred action is about to run
    fn on_deferred(&mut self, task: &str, label: &str);

    /// A deferred action failed; unwinding continues
    fn on_deferred_failed(&mut self, task: &str, label: &str, error: &anyhow::Error);
}

/// Observer that ignores everything.
pub struct Silent;

impl Observer for Silent {
    fn on_task_start(&mut self, _task: &str) {}
    fn on_task_finish(&mut self, _task: &str, _outcome: &Result<()>) {}
    fn on_deferred(&mut self, _task: &str, _label: &str) {}
    fn on_deferred_failed(&mut self, _task: &str, _label: &str, _error: &anyhow::Error) {}
}
