//! Error types for fleet operations.
//!
//! Nothing is rolled back after a failure. Each variant carries enough detail
//! (instance, sub-action, instances already done) for the operator to decide
//! whether to re-run the idempotent bulk operation.

use crate::types::Verb;
use procrun::ExecutionFailed;
use thiserror::Error;

/// Errors that can occur while querying or transitioning instances.
#[derive(Debug, Error)]
pub enum Error {
    /// The service manager listing itself failed
    #[error("could not list units matching '{pattern}'")]
    Discovery {
        /// Unit pattern that was queried
        pattern: String,
        /// Underlying command failure
        #[source]
        source: ExecutionFailed,
    },

    /// The first sub-action on an instance failed
    #[error("{step} failed for {instance} ({} instance(s) done before it)", .completed.len())]
    PartialFleetFailure {
        /// Instance being acted on
        instance: String,
        /// Sub-action that failed
        step: Verb,
        /// Instances fully transitioned before the failure
        completed: Vec<String>,
        /// Underlying command failure
        #[source]
        source: ExecutionFailed,
    },

    /// A later sub-action failed after an earlier one succeeded on the same
    /// instance, leaving it half transitioned (e.g. disabled but running)
    #[error("{step} failed for {instance} after {applied} succeeded; left half-transitioned")]
    IntermediateState {
        /// Instance being acted on
        instance: String,
        /// Last sub-action that did succeed on this instance
        applied: Verb,
        /// Sub-action that failed
        step: Verb,
        /// Instances fully transitioned before this one
        completed: Vec<String>,
        /// Underlying command failure
        #[source]
        source: ExecutionFailed,
    },
}

impl Error {
    /// Instance the failure happened on, if any.
    pub fn instance(&self) -> Option<&str> {
        match self {
            Error::Discovery { .. } => None,
            Error::PartialFleetFailure { instance, .. }
            | Error::IntermediateState { instance, .. } => Some(instance),
        }
    }

    /// Sub-action that failed, if any.
    pub fn step(&self) -> Option<Verb> {
        match self {
            Error::Discovery { .. } => None,
            Error::PartialFleetFailure { step, .. } | Error::IntermediateState { step, .. } => {
                Some(*step)
            }
        }
    }

    /// Instances that were fully transitioned before the failure.
    pub fn completed(&self) -> &[String] {
        match self {
            Error::Discovery { .. } => &[],
            Error::PartialFleetFailure { completed, .. }
            | Error::IntermediateState { completed, .. } => completed,
        }
    }
}

/// Result type for fleet operations.
pub type Result<T> = std::result::Result<T, Error>;
