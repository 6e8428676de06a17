//! Execution engine - runs tasks one at a time with prerequisites first and
//! deferred cleanup last

use crate::error::{Error, Result};
use crate::observer::{Observer, Silent};
use crate::registry::Registry;
use crate::task::Task;
use std::sync::Arc;

type DeferredAction = Box<dyn FnOnce(&mut Runner) -> anyhow::Result<()>>;

struct Deferred {
    label: String,
    action: DeferredAction,
}

/// Runs tasks from a [`Registry`].
pub struct Runner {
    registry: Arc<Registry>,
    active: Vec<String>,
    observer: Box<dyn Observer>,
}

impl Runner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            active: Vec::new(),
            observer: Box::new(Silent),
        }
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Run `name`: prerequisites in order, then the body, then deferred
    /// actions in reverse registration order.
    pub fn run(&mut self, name: &str) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let task = registry.resolve(name)?;

        if let Some(pos) = self.active.iter().position(|n| n == name) {
            let mut chain = self.active[pos..].to_vec();
            chain.push(name.to_string());
            return Err(Error::Cycle(chain));
        }

        self.active.push(name.to_string());
        let result = self.execute(task);
        self.active.pop();
        result
    }

    fn execute(&mut self, task: &Task) -> Result<()> {
        for prerequisite in task.prerequisites() {
            self.run(prerequisite)?;
        }

        log::info!("running task {}", task.name());
        self.observer.on_task_start(task.name());

        let mut scope = Scope {
            runner: &mut *self,
            task: task.name(),
            deferred: Vec::new(),
        };
        let outcome = task.execute(&mut scope);
        let deferred = scope.deferred;

        let cleanup = self.unwind(task.name(), deferred);
        let result = match outcome {
            Err(error) => Err(Error::from_body(task.name(), error)),
            Ok(()) => cleanup,
        };

        if let Err(e) = &result {
            log::debug!("task {} failed: {e}", task.name());
        }
        self.observer.on_task_finish(task.name(), &result);
        result
    }

    fn unwind(&mut self, task: &str, mut deferred: Vec<Deferred>) -> Result<()> {
        let mut first_failure = None;

        while let Some(Deferred { label, action }) = deferred.pop() {
            log::debug!("task {task}: running deferred '{label}'");
            self.observer.on_deferred(task, &label);

            if let Err(error) = action(&mut *self) {
                log::warn!("cleanup '{label}' of task '{task}' failed: {error:#}");
                self.observer.on_deferred_failed(task, &label, &error);
                if first_failure.is_none() {
                    first_failure = Some(Error::DeferredFailed {
                        task: task.to_string(),
                        label,
                        source: error,
                    });
                }
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

/// Handle given to a task body while it runs.
pub struct Scope<'a> {
    runner: &'a mut Runner,
    task: &'a str,
    deferred: Vec<Deferred>,
}

impl Scope<'_> {
    /// Name of the running task.
    pub fn task(&self) -> &str {
        self.task
    }

    /// Run another task to completion from inside this body.
    pub fn run(&mut self, name: &str) -> Result<()> {
        self.runner.run(name)
    }

    /// Register a cleanup action that runs after the body on every exit
    /// path. Actions run most recently registered first.
    pub fn defer<F>(&mut self, label: impl Into<String>, action: F)
    where
        F: FnOnce(&mut Runner) -> anyhow::Result<()> + 'static,
    {
        self.deferred.push(Deferred {
            label: label.into(),
            action: Box::new(action),
        });
    }

    /// Register running task `name` as a cleanup action.
    pub fn defer_task(&mut self, name: impl Into<String>) {
        let name = name.into();
        let label = format!("task {name}");
        self.defer(label, move |runner| {
            runner.run(&name)?;
            Ok(())
        });
    }
}
