//! Error types for task execution.

use thiserror::Error;

/// Errors produced while registering or running tasks.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested task is not registered
    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// A task with this name is already registered
    #[error("duplicate task: {0}")]
    DuplicateTask(String),

    /// A declared prerequisite is not registered
    #[error("task '{task}' depends on unknown task '{missing}'")]
    MissingPrerequisite {
        /// Task declaring the prerequisite
        task: String,
        /// Name that could not be resolved
        missing: String,
    },

    /// A task was re-entered while already running
    #[error("task cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// The task body returned an error
    #[error("task '{task}' failed")]
    Failed {
        /// Task whose body failed
        task: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// The body succeeded but a deferred cleanup action failed
    #[error("cleanup '{label}' of task '{task}' failed")]
    DeferredFailed {
        /// Task that registered the action
        task: String,
        /// Label given when the action was registered
        label: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Convert a body error, passing task-graph errors from nested calls
    /// through untouched.
    pub(crate) fn from_body(task: &str, error: anyhow::Error) -> Self {
        match error.downcast::<Error>() {
            Ok(inner) => inner,
            Err(source) => Error::Failed {
                task: task.to_string(),
                source,
            },
        }
    }

    /// The underlying failure of a body or cleanup action, if any.
    pub fn failure(&self) -> Option<&anyhow::Error> {
        match self {
            Error::Failed { source, .. } | Error::DeferredFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, Error>;
