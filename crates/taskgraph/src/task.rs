//! Task definition

use crate::runner::Scope;
use std::fmt;

/// Body of a task. Errors are reported as [`crate::Error::Failed`].
pub type Body = Box<dyn Fn(&mut Scope<'_>) -> anyhow::Result<()>>;

/// A named unit of work with prerequisites.
pub struct Task {
    name: String,
    description: String,
    prerequisites: Vec<String>,
    body: Body,
}

impl Task {
    /// Create a task with no prerequisites.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Scope<'_>) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            prerequisites: Vec::new(),
            body: Box::new(body),
        }
    }

    /// Attach a one-line description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append prerequisites; they run in the given order.
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub(crate) fn execute(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        (self.body)(scope)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}
