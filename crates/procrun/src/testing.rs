//! Scripted runner for tests.
//!
//! [`ScriptedRunner`] never spawns anything. It records each command line in
//! order and answers from a script: commands registered with
//! [`ScriptedRunner::fail_on`] fail with exit status 1, commands registered
//! with [`ScriptedRunner::respond`] return the given stdout, everything else
//! succeeds with empty output. Pipelines are recorded as `producer | consumer`.

use crate::error::{ExecutionFailed, Result};
use crate::invocation::Invocation;
use crate::{CommandRunner, pipeline_display};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Script {
    calls: Vec<String>,
    failures: HashSet<String>,
    outputs: HashMap<String, String>,
}

/// Records invocations and replays scripted results.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: Mutex<Script>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` (as displayed) exit with status 1.
    pub fn fail_on(&self, command: &str) -> &Self {
        self.lock().failures.insert(command.to_string());
        self
    }

    /// Make `command` (as displayed) print `stdout`.
    pub fn respond(&self, command: &str, stdout: &str) -> &Self {
        self.lock()
            .outputs
            .insert(command.to_string(), stdout.to_string());
        self
    }

    /// Every command line seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self, command: String) -> Result<String> {
        let mut script = self.lock();
        script.calls.push(command.clone());
        if script.failures.contains(&command) {
            return Err(ExecutionFailed::exit(command, Some(1), ""));
        }
        Ok(script.outputs.get(&command).cloned().unwrap_or_default())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        self.answer(invocation.to_string()).map(drop)
    }

    fn output(&self, invocation: &Invocation) -> Result<String> {
        self.answer(invocation.to_string())
    }

    fn pipe(&self, producer: &Invocation, consumer: &Invocation) -> Result<()> {
        self.answer(pipeline_display(producer, consumer)).map(drop)
    }
}
