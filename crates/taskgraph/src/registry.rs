//! Task registry

use crate::error::{Error, Result};
use crate::task::Task;
use std::collections::{BTreeMap, HashSet};

/// All tasks available to a run, keyed by name.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: BTreeMap<String, Task>,
    default: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Names must be unique.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(task.name()) {
            return Err(Error::DuplicateTask(task.name().to_string()));
        }
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Look up a task, failing with [`Error::UnknownTask`].
    pub fn resolve(&self, name: &str) -> Result<&Task> {
        self.get(name)
            .ok_or_else(|| Error::UnknownTask(name.to_string()))
    }

    /// Tasks sorted by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Mark the task to run when none is named.
    pub fn set_default(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.resolve(&name)?;
        self.default = Some(name);
        Ok(())
    }

    pub fn default_task(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Check that every declared prerequisite exists and that declared
    /// prerequisites never loop back.
    ///
    /// Nested calls made from inside task bodies are invisible here; the
    /// runner catches those cycles when they happen.
    pub fn validate(&self) -> Result<()> {
        for task in self.tasks.values() {
            for prerequisite in task.prerequisites() {
                if !self.tasks.contains_key(prerequisite) {
                    return Err(Error::MissingPrerequisite {
                        task: task.name().to_string(),
                        missing: prerequisite.clone(),
                    });
                }
            }
        }

        let mut finished = HashSet::new();
        for name in self.tasks.keys() {
            let mut path = Vec::new();
            self.visit(name, &mut path, &mut finished)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        finished: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if finished.contains(name) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|n| *n == name) {
            let mut chain: Vec<String> = path[pos..].iter().map(ToString::to_string).collect();
            chain.push(name.to_string());
            return Err(Error::Cycle(chain));
        }

        path.push(name);
        let task = self.resolve(name)?;
        for prerequisite in task.prerequisites() {
            self.visit(prerequisite, path, finished)?;
        }
        path.pop();
        finished.insert(name);
        Ok(())
    }
}
