//! Source rewrites swapping the standard mutexes for deadlock-detecting ones
//! and back.

use crate::ui;
use crate::workspace::Workspace;
use anyhow::Result;
use procrun::Invocation;
use std::sync::Arc;
use taskgraph::{Registry, Task};

/// Mutex types replaced by the rewrite, without package qualifier.
const MUTEXES: [&str; 2] = ["Mutex", "RWMutex"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// `sync.*` to `deadlock.*`
    ToDeadlock,
    /// `deadlock.*` back to `sync.*`
    ToSync,
}

impl Direction {
    fn packages(self) -> (&'static str, &'static str) {
        match self {
            Self::ToDeadlock => ("sync", "deadlock"),
            Self::ToSync => ("deadlock", "sync"),
        }
    }
}

pub fn register(registry: &mut Registry, ws: &Arc<Workspace>) -> taskgraph::Result<()> {
    let deadlock_ws = Arc::clone(ws);
    registry.register(
        Task::new("deadlock", move |_| {
            ui::step("Switching to deadlock-detecting mutexes");
            let module = &deadlock_ws.config().integration.deadlock_module;
            deadlock_ws.run(Invocation::new("go").args(["get", module.as_str()]))?;
            rewrite(&deadlock_ws, Direction::ToDeadlock)
        })
        .describe("Replace sync mutexes with go-deadlock mutexes"),
    )?;

    let sync_ws = Arc::clone(ws);
    registry.register(
        Task::new("sync", move |_| {
            ui::step("Restoring sync mutexes");
            rewrite(&sync_ws, Direction::ToSync)
        })
        .describe("Restore sync mutexes after a deadlock run"),
    )
}

fn rewrite(ws: &Workspace, direction: Direction) -> Result<()> {
    let source = ws.config().integration.source_dir.as_str();
    let (from, to) = direction.packages();

    for mutex in MUTEXES {
        let old = format!("{from}.{mutex}");
        let new = format!("{to}.{mutex}");
        ws.pipe(
            Invocation::new("grep").args(["-rl", old.as_str(), source]),
            Invocation::new("xargs")
                .args(["-r", "sed", "-i", "-e"])
                .arg(format!("s/{old}/{new}/g")),
        )?;
    }

    let rewritten = MUTEXES
        .iter()
        .map(|mutex| format!("{to}.{mutex}"))
        .collect::<Vec<_>>()
        .join("\\|");
    ws.pipe(
        Invocation::new("grep").args(["-rl", rewritten.as_str(), source]),
        Invocation::parse("xargs -r goimports -w"),
    )?;

    ws.run(Invocation::parse("go mod tidy"))?;
    Ok(())
}
