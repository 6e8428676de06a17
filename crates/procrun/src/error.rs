//! Failure type shared by every runner.

use std::io;
use thiserror::Error;

/// Why an external command failed.
#[derive(Debug, Error)]
pub enum Cause {
    /// The program could not be started (missing binary, permissions, ...)
    #[error("could not launch: {0}")]
    Launch(#[source] io::Error),

    /// The program ran and exited unsuccessfully
    #[error("{}", describe_exit(.code, .stderr))]
    Exit {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard error, empty when stderr was streamed
        stderr: String,
    },
}

impl Cause {
    /// Exit code of the failed program, if it ran and exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Cause::Exit { code, .. } => *code,
            Cause::Launch(_) => None,
        }
    }
}

fn describe_exit(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    };
    let stderr = stderr.trim();
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

/// An external invocation returned non-zero or failed to launch.
#[derive(Debug, Error)]
#[error("command failed: {command}")]
pub struct ExecutionFailed {
    /// The command line as it would be typed in a shell
    pub command: String,
    /// What went wrong
    #[source]
    pub cause: Cause,
}

impl ExecutionFailed {
    /// Failure to start `command`.
    pub fn launch(command: impl Into<String>, error: io::Error) -> Self {
        Self {
            command: command.into(),
            cause: Cause::Launch(error),
        }
    }

    /// Unsuccessful exit of `command`.
    pub fn exit(command: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cause: Cause::Exit {
                code,
                stderr: stderr.into(),
            },
        }
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, ExecutionFailed>;
